use std::collections::{BTreeSet, HashMap};

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{FestaService, Result};
use festa_domain::schema::RecordKind;
use festa_storage::store::{Comparator, Document, FilterSpec, ID_FIELD, SortSpec};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	/// Case-insensitive author match over name, phone and email.
	#[serde(default)]
	pub term: Option<String>,
	/// Scope the search to this user's event membership and restrict results
	/// to their posts.
	#[serde(default)]
	pub user: Option<Uuid>,
	/// Restrict to posts this user has liked; also scopes the search to their
	/// events when no other scope is given.
	#[serde(default)]
	pub likes: Option<Uuid>,
	/// Scope the search to a single event.
	#[serde(default)]
	pub event: Option<Uuid>,
}

/// Author fields surfaced by search results. Everything else the user record
/// holds stays out of the projection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorProfile {
	pub id: Uuid,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	pub id: Uuid,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	pub event: Option<Uuid>,
	pub like_count: usize,
	pub author: AuthorProfile,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
}

impl FestaService {
	/// Relationship-aware post search. The scope is the event set the request
	/// resolves to; a request that resolves to no events answers with an empty
	/// result rather than scanning every post.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let scope = self.resolve_scope(&req).await?;

		if scope.is_empty() {
			tracing::info!("Search request resolved to an empty event scope.");

			return Ok(SearchResponse::default());
		}

		let mut filter = FilterSpec::new();

		filter.push(
			"event",
			Comparator::In,
			Value::Array(scope.iter().map(|id| Value::String(id.to_string())).collect()),
		);
		if let Some(user) = req.user {
			filter.push("user", Comparator::Eq, Value::String(user.to_string()));
		}
		if let Some(likes) = req.likes {
			filter.push("likes", Comparator::Contains, Value::String(likes.to_string()));
		}

		let posts = self.store.find(RecordKind::Post, &filter, &SortSpec::none()).await?;
		let authors = self.load_authors(&posts).await?;
		let matcher = match req.term.as_deref().map(str::trim).filter(|term| !term.is_empty()) {
			Some(term) => Some(
				RegexBuilder::new(&regex::escape(term))
					.case_insensitive(true)
					.build()
					.map_err(|err| crate::Error::validation(err.to_string()))?,
			),
			None => None,
		};

		let mut items = Vec::new();

		for post in &posts {
			// A post whose author record is gone drops out of the results.
			let Some(author) = post
				.str_field("user")
				.and_then(|raw| Uuid::parse_str(raw).ok())
				.and_then(|id| authors.get(&id))
			else {
				continue;
			};

			if let Some(matcher) = &matcher {
				let hit = [author.str_field("name"), author.str_field("phone"), author.str_field("email")]
					.into_iter()
					.flatten()
					.any(|value| matcher.is_match(value));

				if !hit {
					continue;
				}
			}

			items.push(SearchItem {
				id: post.id,
				image: post.str_field("image").map(str::to_string),
				created_at: post.str_field("created_at").map(str::to_string),
				event: post.str_field("event").and_then(|raw| Uuid::parse_str(raw).ok()),
				like_count: post.array_field("likes").len(),
				author: AuthorProfile {
					id: author.id,
					name: author.str_field("name").map(str::to_string),
					phone: author.str_field("phone").map(str::to_string),
					email: author.str_field("email").map(str::to_string),
				},
			});
		}

		tracing::info!(scope = scope.len(), hits = items.len(), "Search completed.");

		Ok(SearchResponse { items })
	}

	/// Membership scoping wins over an explicit event; an otherwise
	/// unqualified request scopes to nothing.
	async fn resolve_scope(&self, req: &SearchRequest) -> Result<BTreeSet<Uuid>> {
		if let Some(user) = req.user {
			return self.resolve_membership(user).await;
		}
		if let Some(likes) = req.likes {
			return self.resolve_membership(likes).await;
		}
		if let Some(event) = req.event {
			return Ok(BTreeSet::from([event]));
		}

		Ok(BTreeSet::new())
	}

	/// Batch-loads the author records referenced by the posts. The lookup is a
	/// raw join; deactivated authors still resolve here, matching how the
	/// result projection already limits what leaves the service.
	async fn load_authors(&self, posts: &[Document]) -> Result<HashMap<Uuid, Document>> {
		let ids = posts
			.iter()
			.filter_map(|post| post.str_field("user"))
			.filter_map(|raw| Uuid::parse_str(raw).ok())
			.collect::<BTreeSet<_>>();

		if ids.is_empty() {
			return Ok(HashMap::new());
		}

		let mut filter = FilterSpec::new();

		filter.push(
			ID_FIELD,
			Comparator::In,
			Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect()),
		);

		let users = self.store.find(RecordKind::User, &filter, &SortSpec::none()).await?;

		Ok(users.into_iter().map(|user| (user.id, user)).collect())
	}
}
