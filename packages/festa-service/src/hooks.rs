//! Explicit pipeline stages that the engine invokes around store calls,
//! replacing the implicit lifecycle callbacks the record types used to carry.

use serde_json::Value;
use uuid::Uuid;

use crate::{FestaService, Result, id_value};
use festa_domain::schema::RecordKind;
use festa_storage::store::{Comparator, Document, FilterSpec};

/// Pre-find stage: user reads never surface deactivated accounts. A missing
/// `active` field counts as active, which is why the predicate is `Ne false`
/// rather than `Eq true`.
pub fn before_find(kind: RecordKind, filter: &mut FilterSpec) {
	if kind == RecordKind::User {
		filter.push("active", Comparator::Ne, Value::Bool(false));
	}
}

/// Single-document variant of the pre-find stage.
pub fn passes_find_guard(doc: &Document) -> bool {
	doc.kind != RecordKind::User || doc.fields.get("active") != Some(&Value::Bool(false))
}

/// Post-persist stage: establishing or re-owning an event links the event id
/// into the owner's created-events set. The link is an independent atomic
/// add-to-set; it is not transactional with the event write.
pub async fn link_event_creator(service: &FestaService, event: &Document) -> Result<()> {
	if event.kind != RecordKind::Event {
		return Ok(());
	}

	let Some(owner_id) = event.str_field("user").and_then(|raw| Uuid::parse_str(raw).ok()) else {
		return Ok(());
	};

	service
		.store
		.add_to_set(RecordKind::User, owner_id, "events_as_creator", vec![id_value(event.id)])
		.await?;

	Ok(())
}
