use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{FestaService, Result, dedupe_array_values, hooks, partition_fields, strip_sensitive, validation_error};
use festa_domain::{schema, validate};
use festa_storage::store::Document;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateRequest {
	pub kind: schema::RecordKind,
	pub id: Uuid,
	pub fields: Map<String, Value>,
}

impl FestaService {
	/// Merge-updates a document. Scalar fields are replaced wholesale in one
	/// patch; each set field is then unioned into the stored array as its own
	/// atomic add-to-set. The scalar patch and the set unions are separate
	/// store calls, so a failing union leaves the scalar change in place.
	pub async fn update(&self, req: UpdateRequest) -> Result<Document> {
		let UpdateRequest { kind, id, mut fields } = req;

		dedupe_array_values(&mut fields);

		let issues = validate::validate_fields(kind, &fields, false);

		if !issues.is_empty() {
			return Err(validation_error(issues));
		}

		let (mut scalars, sets) = partition_fields(kind, fields)?;

		for transient in schema::transient_fields(kind) {
			scalars.remove(*transient);
		}

		let relinked = kind == schema::RecordKind::Event && scalars.contains_key("user");
		let mut latest = None;

		if !scalars.is_empty() {
			latest = Some(
				self.store
					.replace_fields(kind, id, scalars)
					.await?
					.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?,
			);
		}
		for (field, values) in sets {
			if values.is_empty() {
				continue;
			}

			latest = Some(
				self.store
					.add_to_set(kind, id, &field, values)
					.await?
					.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?,
			);
		}

		let mut doc = match latest {
			Some(doc) => doc,
			// Empty patch still answers with the current document.
			None => self
				.store
				.get(kind, id)
				.await?
				.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?,
		};

		if relinked {
			hooks::link_event_creator(self, &doc).await?;
		}

		tracing::debug!(kind = kind.as_str(), id = %doc.id, "Document updated.");

		strip_sensitive(&mut doc, &[]);

		Ok(doc)
	}
}
