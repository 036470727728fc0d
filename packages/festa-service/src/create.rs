use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{FestaService, Result, dedupe_array_values, hooks, partition_fields, strip_sensitive, validation_error};
use festa_domain::{schema, validate};
use festa_storage::store::Document;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRequest {
	pub kind: schema::RecordKind,
	pub fields: Map<String, Value>,
}

impl FestaService {
	/// Establishes a new document. Scalar fields and empty arrays form the
	/// base record; non-empty set fields are unioned in afterwards against
	/// the new identifier, each as its own atomic operation.
	pub async fn create(&self, req: CreateRequest) -> Result<Document> {
		let CreateRequest { kind, mut fields } = req;

		dedupe_array_values(&mut fields);

		let issues = validate::validate_fields(kind, &fields, true);

		if !issues.is_empty() {
			return Err(validation_error(issues));
		}

		let (mut scalars, sets) = partition_fields(kind, fields)?;

		for transient in schema::transient_fields(kind) {
			scalars.remove(*transient);
		}

		apply_defaults(kind, &mut scalars);

		let mut base = scalars;
		let mut pending = Vec::new();

		for (field, values) in sets {
			if values.is_empty() {
				base.insert(field, Value::Array(Vec::new()));
			} else {
				pending.push((field, values));
			}
		}
		for declared in schema::set_fields(kind) {
			if !base.contains_key(*declared)
				&& !pending.iter().any(|(field, _)| field == declared)
			{
				base.insert(declared.to_string(), Value::Array(Vec::new()));
			}
		}

		let mut doc = self.store.insert(Document::new(kind, base)).await?;

		tracing::debug!(kind = kind.as_str(), id = %doc.id, "Document created.");

		for (field, values) in pending {
			doc = self
				.store
				.add_to_set(kind, doc.id, &field, values)
				.await?
				.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;
		}

		hooks::link_event_creator(self, &doc).await?;

		strip_sensitive(&mut doc, &[]);

		Ok(doc)
	}
}

fn apply_defaults(kind: schema::RecordKind, scalars: &mut Map<String, Value>) {
	match kind {
		schema::RecordKind::User => {
			scalars.entry("role").or_insert_with(|| Value::String("user".to_string()));
			scalars.entry("active").or_insert(Value::Bool(true));
		},
		schema::RecordKind::Post | schema::RecordKind::Photo => {
			if !scalars.contains_key("created_at")
				&& let Ok(now) = OffsetDateTime::now_utc().format(&Rfc3339)
			{
				scalars.insert("created_at".to_string(), Value::String(now));
			}
		},
		schema::RecordKind::Event => {},
	}
}
