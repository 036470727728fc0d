use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{FestaService, Result, hooks, ref_ids};
use festa_domain::schema::RecordKind;

impl FestaService {
	/// Resolves the set of events a user belongs to: the union of the events
	/// they created and the events they attend as a guest. A user holding
	/// neither resolves to the empty set, not an error.
	pub async fn resolve_membership(&self, user_id: Uuid) -> Result<BTreeSet<Uuid>> {
		let user = self
			.store
			.get(RecordKind::User, user_id)
			.await?
			.filter(hooks::passes_find_guard)
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		let mut events = BTreeSet::new();

		events.extend(ref_ids(user.array_field("events_as_creator")));
		events.extend(ref_ids(user.array_field("events_as_guest")));

		Ok(events)
	}
}
