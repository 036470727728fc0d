use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{FestaService, Result, hooks};
use festa_domain::{phone, schema::RecordKind};
use festa_storage::store::{Comparator, Document, FilterSpec, ID_FIELD, SortSpec};

/// Shallow event projection answered by guest-phone lookups.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventSummary {
	pub id: Uuid,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image_cover: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
}

impl EventSummary {
	fn of(doc: &Document) -> Self {
		Self {
			id: doc.id,
			name: doc.str_field("name").map(str::to_string),
			image_cover: doc.str_field("image_cover").map(str::to_string),
			date: doc.str_field("date").map(str::to_string),
		}
	}
}

impl FestaService {
	/// Finds the events whose guest list carries the given phone number,
	/// optionally scoped to one event. Matching ignores formatting and an
	/// international prefix; a number that does not normalize matches nothing.
	pub async fn match_guest_phone(
		&self,
		raw_phone: &str,
		event: Option<Uuid>,
	) -> Result<Vec<EventSummary>> {
		if phone::normalize(raw_phone).is_none() {
			return Ok(Vec::new());
		}

		let mut filter = FilterSpec::new();

		if let Some(event) = event {
			filter.push(ID_FIELD, Comparator::Eq, Value::String(event.to_string()));
		}

		let events = self.store.find(RecordKind::Event, &filter, &SortSpec::none()).await?;
		let matched = events
			.iter()
			.filter(|doc| {
				doc.array_field("guests_phones")
					.iter()
					.filter_map(Value::as_str)
					.any(|entry| phone::matches(entry, raw_phone))
			})
			.map(EventSummary::of)
			.collect();

		Ok(matched)
	}

	/// Recomputes the user's guest-event set from their phone number and
	/// stores it wholesale, replacing whatever the set held before. Returns
	/// the matched event identifiers.
	pub async fn link_guest_events(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
		let user = self
			.store
			.get(RecordKind::User, user_id)
			.await?
			.filter(hooks::passes_find_guard)
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;
		let Some(user_phone) = user.str_field("phone") else {
			return Ok(Vec::new());
		};

		let events = self.match_guest_phone(user_phone, None).await?;
		let ids = events.iter().map(|event| event.id).collect::<Vec<_>>();
		let mut patch = Map::new();

		patch.insert(
			"events_as_guest".to_string(),
			Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect()),
		);

		self.store
			.replace_fields(RecordKind::User, user_id, patch)
			.await?
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		tracing::info!(%user_id, linked = ids.len(), "Guest events linked.");

		Ok(ids)
	}
}
