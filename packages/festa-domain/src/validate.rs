use serde_json::{Map, Value};

use crate::{
	phone,
	schema::{self, RecordKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
	pub field: String,
	pub message: String,
}

impl FieldIssue {
	fn new(field: &str, message: impl Into<String>) -> Self {
		Self { field: field.to_string(), message: message.into() }
	}
}

/// Runs the record kind's validation rules against a submitted field map.
/// `creating` additionally enforces required fields. Returns every violated
/// rule so callers can report them in one response.
pub fn validate_fields(kind: RecordKind, fields: &Map<String, Value>, creating: bool) -> Vec<FieldIssue> {
	let mut issues = Vec::new();

	if creating {
		for required in schema::required_fields(kind) {
			if fields.get(*required).map(is_present).unwrap_or(false) {
				continue;
			}

			issues.push(FieldIssue::new(required, format!("{required} is required.")));
		}
	}

	match kind {
		RecordKind::User => validate_user(fields, &mut issues),
		RecordKind::Event => validate_event(fields, &mut issues),
		RecordKind::Post | RecordKind::Photo => {},
	}

	issues
}

fn validate_user(fields: &Map<String, Value>, issues: &mut Vec<FieldIssue>) {
	if let Some(email) = str_field(fields, "email")
		&& !is_email(email)
	{
		issues.push(FieldIssue::new("email", "Please enter a valid email."));
	}
	if let Some(number) = str_field(fields, "phone")
		&& !phone::is_mobile(number)
	{
		issues.push(FieldIssue::new("phone", "Please enter a valid mobile phone number."));
	}
	if let Some(role) = str_field(fields, "role")
		&& !matches!(role, "user" | "admin")
	{
		issues.push(FieldIssue::new("role", "role must be one of user or admin."));
	}

	let password = str_field(fields, "password");

	if let Some(password) = password
		&& password.chars().count() < 8
	{
		issues.push(FieldIssue::new("password", "password must be at least 8 characters."));
	}
	if password.is_some() || fields.contains_key("password_confirm") {
		let confirm = str_field(fields, "password_confirm");

		if password != confirm {
			issues.push(FieldIssue::new("password_confirm", "Passwords are not the same."));
		}
	}
}

fn validate_event(fields: &Map<String, Value>, issues: &mut Vec<FieldIssue>) {
	if let Some(time_of_day) = str_field(fields, "time_of_day")
		&& !matches!(time_of_day, "morning" | "afternoon" | "evening")
	{
		issues.push(FieldIssue::new(
			"time_of_day",
			"time_of_day must be one of morning, afternoon, or evening.",
		));
	}
	if let Some(Value::Array(numbers)) = fields.get("guests_phones") {
		for number in numbers {
			if number.as_str().map(phone::is_mobile).unwrap_or(false) {
				continue;
			}

			issues.push(FieldIssue::new(
				"guests_phones",
				"Please enter a valid mobile phone number.",
			));

			break;
		}
	}
}

fn is_present(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::String(s) => !s.trim().is_empty(),
		_ => true,
	}
}

fn str_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
	fields.get(name).and_then(Value::as_str)
}

fn is_email(raw: &str) -> bool {
	let Some((local, domain)) = raw.split_once('@') else {
		return false;
	};

	!local.is_empty()
		&& !domain.is_empty()
		&& !domain.starts_with('.')
		&& !domain.ends_with('.')
		&& domain.contains('.')
		&& !raw.contains(char::is_whitespace)
}
