use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{FestaService, Result};
use festa_domain::schema::RecordKind;

impl FestaService {
	/// Removes a document permanently.
	pub async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<()> {
		if !self.store.delete(kind, id).await? {
			return Err(crate::Error::not_found("No document found with that ID."));
		}

		tracing::debug!(kind = kind.as_str(), %id, "Document deleted.");

		Ok(())
	}

	/// Soft-deletes a user account. The record survives but the pre-find guard
	/// hides it from every subsequent read.
	pub async fn deactivate(&self, user_id: Uuid) -> Result<()> {
		let mut patch = Map::new();

		patch.insert("active".to_string(), Value::Bool(false));

		self.store
			.replace_fields(RecordKind::User, user_id, patch)
			.await?
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		tracing::info!(%user_id, "User deactivated.");

		Ok(())
	}
}
