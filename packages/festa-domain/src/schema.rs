use serde::{Deserialize, Serialize};

/// The named document categories this service stores. Each kind carries a
/// declared schema fixed at compile time; field kinds are never inferred from
/// request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
	User,
	Event,
	Post,
	Photo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	Scalar,
	SetOfRef,
	SetOfScalar,
}

impl RecordKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Event => "event",
			Self::Post => "post",
			Self::Photo => "photo",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"user" | "users" => Some(Self::User),
			"event" | "events" => Some(Self::Event),
			"post" | "posts" => Some(Self::Post),
			"photo" | "photos" => Some(Self::Photo),
			_ => None,
		}
	}
}

/// Declared kind of a field, or `None` when the field is not part of the
/// record kind's schema. Callers treat `None` as a client error.
pub fn field_kind(kind: RecordKind, field: &str) -> Option<FieldKind> {
	match (kind, field) {
		(
			RecordKind::User,
			"name" | "email" | "phone" | "role" | "password" | "password_confirm" | "active",
		) => Some(FieldKind::Scalar),
		(RecordKind::User, "events_as_guest" | "events_as_creator") => Some(FieldKind::SetOfRef),
		(RecordKind::User, "pictures") => Some(FieldKind::SetOfScalar),
		(
			RecordKind::Event,
			"name" | "owner" | "user" | "date" | "time_of_day" | "venue" | "image_cover",
		) => Some(FieldKind::Scalar),
		(RecordKind::Event, "guests") => Some(FieldKind::SetOfRef),
		(RecordKind::Event, "guests_phones") => Some(FieldKind::SetOfScalar),
		(RecordKind::Post, "image" | "created_at" | "user" | "event") => Some(FieldKind::Scalar),
		(RecordKind::Post, "likes") => Some(FieldKind::SetOfRef),
		(RecordKind::Photo, "name" | "created_at" | "event" | "user") => Some(FieldKind::Scalar),
		(RecordKind::Photo, "tagged_users") => Some(FieldKind::SetOfRef),
		_ => None,
	}
}

/// Declared set-valued fields of the kind, in declaration order. New records
/// materialize each of these as an empty array when the caller supplies no
/// value.
pub fn set_fields(kind: RecordKind) -> &'static [&'static str] {
	match kind {
		RecordKind::User => &["events_as_guest", "events_as_creator", "pictures"],
		RecordKind::Event => &["guests_phones", "guests"],
		RecordKind::Post => &["likes"],
		RecordKind::Photo => &["tagged_users"],
	}
}

/// The record kind a reference field points at, for fields holding document
/// identifiers (scalar or set-valued).
pub fn ref_target(kind: RecordKind, field: &str) -> Option<RecordKind> {
	match (kind, field) {
		(RecordKind::User, "events_as_guest" | "events_as_creator") => Some(RecordKind::Event),
		(RecordKind::Event, "user") => Some(RecordKind::User),
		(RecordKind::Event, "guests") => Some(RecordKind::User),
		(RecordKind::Post, "user") | (RecordKind::Photo, "user") => Some(RecordKind::User),
		(RecordKind::Post, "event") | (RecordKind::Photo, "event") => Some(RecordKind::Event),
		(RecordKind::Post, "likes") => Some(RecordKind::User),
		(RecordKind::Photo, "tagged_users") => Some(RecordKind::User),
		_ => None,
	}
}

/// Fields required when establishing a new record of the kind.
pub fn required_fields(kind: RecordKind) -> &'static [&'static str] {
	match kind {
		RecordKind::User => &["name", "email", "phone", "password", "password_confirm"],
		RecordKind::Event => &["name", "user", "date"],
		RecordKind::Post => &["user", "event"],
		RecordKind::Photo => &["name", "event"],
	}
}

/// Fields allowed as sort keys in dynamic queries.
pub fn sortable_fields(kind: RecordKind) -> &'static [&'static str] {
	match kind {
		RecordKind::User => &["name", "email"],
		RecordKind::Event => &["name", "date"],
		RecordKind::Post => &["created_at"],
		RecordKind::Photo => &["name", "created_at"],
	}
}

/// Fields absent from default projections. They only appear when a caller
/// requests them by name.
pub fn sensitive_fields(kind: RecordKind) -> &'static [&'static str] {
	match kind {
		RecordKind::User => &["password", "password_confirm", "active"],
		RecordKind::Event => &["guests_phones"],
		RecordKind::Post | RecordKind::Photo => &[],
	}
}

/// Fields validated on input but never written to the store.
pub fn transient_fields(kind: RecordKind) -> &'static [&'static str] {
	match kind {
		RecordKind::User => &["password_confirm"],
		_ => &[],
	}
}

pub fn is_sensitive(kind: RecordKind, field: &str) -> bool {
	sensitive_fields(kind).contains(&field)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_declared_fields() {
		assert_eq!(field_kind(RecordKind::User, "name"), Some(FieldKind::Scalar));
		assert_eq!(field_kind(RecordKind::User, "pictures"), Some(FieldKind::SetOfScalar));
		assert_eq!(field_kind(RecordKind::Post, "likes"), Some(FieldKind::SetOfRef));
		assert_eq!(field_kind(RecordKind::Event, "guests_phones"), Some(FieldKind::SetOfScalar));
	}

	#[test]
	fn unknown_field_is_none() {
		assert_eq!(field_kind(RecordKind::Post, "tagged_users"), None);
		assert_eq!(field_kind(RecordKind::User, "nope"), None);
	}

	#[test]
	fn kind_round_trips_through_parse() {
		for kind in [RecordKind::User, RecordKind::Event, RecordKind::Post, RecordKind::Photo] {
			assert_eq!(RecordKind::parse(kind.as_str()), Some(kind));
		}
		assert_eq!(RecordKind::parse("posts"), Some(RecordKind::Post));
		assert_eq!(RecordKind::parse("tag"), None);
	}
}
