pub mod create;
pub mod delete;
pub mod get;
pub mod guests;
pub mod hooks;
pub mod likes;
pub mod membership;
pub mod query;
pub mod search;
pub mod update;

mod error;

pub use error::{Error, Result};

pub use create::CreateRequest;
pub use get::{GetOneRequest, RefSummary};
pub use guests::EventSummary;
pub use query::QuerySpec;
pub use search::{AuthorProfile, SearchItem, SearchRequest, SearchResponse};
pub use update::UpdateRequest;

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use festa_domain::schema::{self, FieldKind, RecordKind};
use festa_storage::store::{Document, DocumentStore};

/// The core service. Holds no per-request state; every operation receives,
/// transforms, and returns documents owned by the store.
pub struct FestaService {
	pub cfg: festa_config::Config,
	pub store: Arc<dyn DocumentStore>,
}

impl FestaService {
	pub fn new(cfg: festa_config::Config, store: Arc<dyn DocumentStore>) -> Self {
		Self { cfg, store }
	}
}

/// Collapses repeated values inside every array-valued field of the request,
/// preserving first-appearance order.
pub(crate) fn dedupe_array_values(fields: &mut Map<String, Value>) {
	for value in fields.values_mut() {
		let Value::Array(members) = value else {
			continue;
		};
		let mut seen: Vec<Value> = Vec::with_capacity(members.len());

		for member in members.drain(..) {
			if !seen.contains(&member) {
				seen.push(member);
			}
		}

		*members = seen;
	}
}

/// Partitions submitted fields into the scalar group and the set group using
/// the declared schema. A field not declared on the record kind fails with
/// SchemaMismatch before anything is written. A single value submitted for a
/// set field counts as a one-element union.
pub(crate) fn partition_fields(
	kind: RecordKind,
	fields: Map<String, Value>,
) -> Result<(Map<String, Value>, Vec<(String, Vec<Value>)>)> {
	let mut scalars = Map::new();
	let mut sets = Vec::new();

	for (field, value) in fields {
		match schema::field_kind(kind, &field) {
			None => return Err(Error::schema_mismatch(kind, &field)),
			Some(FieldKind::Scalar) => {
				scalars.insert(field, value);
			},
			Some(FieldKind::SetOfRef | FieldKind::SetOfScalar) => {
				let values = match value {
					Value::Array(members) => members,
					other => vec![other],
				};

				sets.push((field, values));
			},
		}
	}

	Ok((scalars, sets))
}

/// Removes sensitive fields from an outgoing document unless the caller asked
/// for them by name.
pub(crate) fn strip_sensitive(doc: &mut Document, keep: &[String]) {
	for field in schema::sensitive_fields(doc.kind) {
		if keep.iter().any(|kept| kept == field) {
			continue;
		}

		doc.fields.remove(*field);
	}
}

pub(crate) fn id_value(id: Uuid) -> Value {
	Value::String(id.to_string())
}

/// Collects the document identifiers held by a reference array, ignoring
/// entries that do not parse.
pub(crate) fn ref_ids(values: &[Value]) -> Vec<Uuid> {
	values
		.iter()
		.filter_map(Value::as_str)
		.filter_map(|raw| Uuid::parse_str(raw).ok())
		.collect()
}

pub(crate) fn validation_error(issues: Vec<festa_domain::validate::FieldIssue>) -> Error {
	let message = issues
		.iter()
		.map(|issue| issue.message.as_str())
		.collect::<Vec<_>>()
		.join(" ");
	let fields = issues.into_iter().map(|issue| issue.field).collect();

	Error::Validation { message, fields }
}
