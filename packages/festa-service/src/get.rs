use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{FestaService, Result, hooks, query, ref_ids, strip_sensitive};
use festa_domain::schema::{self, FieldKind, RecordKind};
use festa_storage::store::{Comparator, Document, FilterSpec, SortSpec};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetOneRequest {
	pub kind: RecordKind,
	pub id: Uuid,
	/// Sensitive fields to keep in the projection, named explicitly.
	#[serde(default)]
	pub include: Vec<String>,
	/// Reference fields to expand into summaries in place of raw identifiers.
	#[serde(default)]
	pub relations: Vec<String>,
}

/// Shallow projection of a referenced document, substituted for its raw
/// identifier when the caller asks for the relation by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefSummary {
	pub id: Uuid,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image_cover: Option<String>,
}

impl RefSummary {
	fn of(doc: &Document) -> Self {
		Self {
			id: doc.id,
			name: doc.str_field("name").map(str::to_string),
			image_cover: doc.str_field("image_cover").map(str::to_string),
		}
	}
}

impl FestaService {
	/// Retrieves one document by identifier. Deactivated users read as absent.
	pub async fn get_one(&self, req: GetOneRequest) -> Result<Document> {
		let GetOneRequest { kind, id, include, relations } = req;
		let mut doc = self
			.store
			.get(kind, id)
			.await?
			.filter(hooks::passes_find_guard)
			.ok_or_else(|| crate::Error::not_found("No document found with that ID."))?;

		for relation in &relations {
			self.expand_relation(&mut doc, relation).await?;
		}

		strip_sensitive(&mut doc, &include);

		Ok(doc)
	}

	/// Retrieves every document of the kind matching the request parameters,
	/// translated through the dynamic query builder. User listings never
	/// include deactivated accounts.
	pub async fn get_all(
		&self,
		kind: RecordKind,
		params: &BTreeMap<String, String>,
	) -> Result<Vec<Document>> {
		let mut spec = query::build_query(kind, params)?;

		hooks::before_find(kind, &mut spec.filter);

		let mut docs = self.store.find(kind, &spec.filter, &spec.sort).await?;

		for doc in &mut docs {
			strip_sensitive(doc, &[]);
		}

		Ok(docs)
	}

	/// Replaces the raw identifiers held by a reference field with shallow
	/// summaries of the documents they point at, resolved in one batch read.
	/// Identifiers whose target no longer exists are dropped from the
	/// expansion rather than surfaced as an error.
	async fn expand_relation(&self, doc: &mut Document, relation: &str) -> Result<()> {
		let Some(target) = schema::ref_target(doc.kind, relation) else {
			return Err(crate::Error::schema_mismatch(doc.kind, relation));
		};

		match schema::field_kind(doc.kind, relation) {
			Some(FieldKind::SetOfRef) => {
				let ids = ref_ids(doc.array_field(relation));
				let summaries = self.summarize(target, &ids).await?;

				doc.fields.insert(relation.to_string(), serde_json::to_value(summaries)?);
			},
			Some(FieldKind::Scalar) => {
				let Some(id) = doc.str_field(relation).and_then(|raw| Uuid::parse_str(raw).ok())
				else {
					return Ok(());
				};
				let summaries = self.summarize(target, &[id]).await?;

				if let Some(summary) = summaries.into_iter().next() {
					doc.fields.insert(relation.to_string(), serde_json::to_value(summary)?);
				}
			},
			_ => return Err(crate::Error::schema_mismatch(doc.kind, relation)),
		}

		Ok(())
	}

	async fn summarize(&self, target: RecordKind, ids: &[Uuid]) -> Result<Vec<RefSummary>> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let mut filter = FilterSpec::new();

		filter.push(
			festa_storage::store::ID_FIELD,
			Comparator::In,
			Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect()),
		);
		hooks::before_find(target, &mut filter);

		let docs = self.store.find(target, &filter, &SortSpec::none()).await?;

		Ok(docs.iter().map(RefSummary::of).collect())
	}
}
