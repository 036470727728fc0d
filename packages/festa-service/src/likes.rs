use uuid::Uuid;

use crate::{FestaService, Result, id_value};
use festa_domain::schema::RecordKind;

impl FestaService {
	/// Records a like. Liking a post twice is a no-op; liking one's own post
	/// is rejected.
	pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
		let post = self
			.store
			.get(RecordKind::Post, post_id)
			.await?
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		if post.str_field("user") == Some(user_id.to_string().as_str()) {
			return Err(crate::Error::Forbidden {
				message: "You can not like your own post.".to_string(),
			});
		}

		self.store
			.add_to_set(RecordKind::Post, post_id, "likes", vec![id_value(user_id)])
			.await?
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		Ok(())
	}

	/// Withdraws a like. Unliking a post that was never liked is a no-op.
	pub async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
		self.store
			.remove_from_set(RecordKind::Post, post_id, "likes", id_value(user_id))
			.await?
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		Ok(())
	}
}
