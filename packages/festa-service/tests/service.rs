use std::{collections::BTreeMap, sync::Arc};

use serde_json::{Map, Value, json};
use uuid::Uuid;

use festa_domain::schema::RecordKind;
use festa_service::{CreateRequest, Error, FestaService, GetOneRequest, SearchRequest, UpdateRequest};
use festa_storage::store::{BoxFuture, Document, DocumentStore, FilterSpec, SortSpec};
use festa_testkit::MemStore;

fn service() -> (FestaService, Arc<MemStore>) {
	let store = Arc::new(MemStore::new());
	let cfg = festa_config::Config {
		service: festa_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: festa_config::Storage {
			postgres: festa_config::Postgres {
				dsn: "postgres://localhost/unused".to_string(),
				pool_max_conns: 1,
			},
		},
	};

	(FestaService::new(cfg, store.clone()), store)
}

fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
	pairs.iter().map(|(key, value)| (key.to_string(), value.clone())).collect()
}

fn user_fields(name: &str, email: &str, phone: &str) -> Map<String, Value> {
	fields(&[
		("name", json!(name)),
		("email", json!(email)),
		("phone", json!(phone)),
		("password", json!("s3cret-s3cret")),
		("password_confirm", json!("s3cret-s3cret")),
	])
}

async fn create_user(service: &FestaService, name: &str, email: &str, phone: &str) -> Document {
	service
		.create(CreateRequest { kind: RecordKind::User, fields: user_fields(name, email, phone) })
		.await
		.unwrap()
}

async fn create_event(service: &FestaService, name: &str, owner: Uuid, date: &str) -> Document {
	service
		.create(CreateRequest {
			kind: RecordKind::Event,
			fields: fields(&[
				("name", json!(name)),
				("user", json!(owner.to_string())),
				("date", json!(date)),
			]),
		})
		.await
		.unwrap()
}

async fn create_post(service: &FestaService, author: Uuid, event: Uuid) -> Document {
	service
		.create(CreateRequest {
			kind: RecordKind::Post,
			fields: fields(&[
				("user", json!(author.to_string())),
				("event", json!(event.to_string())),
			]),
		})
		.await
		.unwrap()
}

#[tokio::test]
async fn create_user_applies_defaults_and_strips_secrets() {
	let (service, store) = service();
	let user = create_user(&service, "Ana Costa", "ana@example.com", "5551234567").await;

	assert_eq!(user.str_field("role"), Some("user"));
	assert!(!user.fields.contains_key("password"));
	assert!(!user.fields.contains_key("password_confirm"));
	assert!(!user.fields.contains_key("active"));
	// Declared set fields materialize as empty arrays.
	assert_eq!(user.array_field("events_as_guest"), &[] as &[Value]);
	assert_eq!(user.array_field("events_as_creator"), &[] as &[Value]);
	assert_eq!(user.array_field("pictures"), &[] as &[Value]);

	let stored = store.get(RecordKind::User, user.id).await.unwrap().unwrap();

	assert_eq!(stored.fields.get("active"), Some(&Value::Bool(true)));
	assert_eq!(stored.str_field("password"), Some("s3cret-s3cret"));
	assert!(!stored.fields.contains_key("password_confirm"));
}

#[tokio::test]
async fn create_rejects_missing_required_fields() {
	let (service, _) = service();
	let err = service
		.create(CreateRequest {
			kind: RecordKind::User,
			fields: fields(&[("name", json!("Ana"))]),
		})
		.await
		.unwrap_err();

	let Error::Validation { fields, .. } = err else {
		panic!("expected a validation error, got {err:?}");
	};

	assert!(fields.contains(&"email".to_string()));
	assert!(fields.contains(&"password".to_string()));
}

#[tokio::test]
async fn create_with_unknown_field_writes_nothing() {
	let (service, store) = service();
	let mut payload = user_fields("Ana", "ana@example.com", "5551234567");

	payload.insert("nickname".to_string(), json!("ana"));

	let err = service
		.create(CreateRequest { kind: RecordKind::User, fields: payload })
		.await
		.unwrap_err();

	assert!(matches!(err, Error::SchemaMismatch { .. }));

	let all = store
		.find(RecordKind::User, &FilterSpec::new(), &SortSpec::none())
		.await
		.unwrap();

	assert!(all.is_empty());
}

#[tokio::test]
async fn update_replaces_scalars_and_unions_sets() {
	let (service, store) = service();
	let owner = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", owner.id, "2026-06-21").await;

	service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: event.id,
			fields: fields(&[
				("venue", json!("Riverside")),
				("guests_phones", json!(["5550001111", "5550002222"])),
			]),
		})
		.await
		.unwrap();
	let updated = service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: event.id,
			fields: fields(&[
				("venue", json!("Garden")),
				("guests_phones", json!(["5550002222", "5550003333"])),
			]),
		})
		.await
		.unwrap();

	assert_eq!(updated.str_field("venue"), Some("Garden"));

	let stored = store.get(RecordKind::Event, event.id).await.unwrap().unwrap();

	// Scalars replaced wholesale; sets unioned, never truncated.
	assert_eq!(
		stored.fields.get("guests_phones"),
		Some(&json!(["5550001111", "5550002222", "5550003333"]))
	);
}

#[tokio::test]
async fn update_set_is_idempotent() {
	let (service, store) = service();
	let owner = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", owner.id, "2026-06-21").await;

	for _ in 0..2 {
		service
			.update(UpdateRequest {
				kind: RecordKind::Event,
				id: event.id,
				fields: fields(&[("guests_phones", json!(["5550001111", "5550001111"]))]),
			})
			.await
			.unwrap();
	}

	let stored = store.get(RecordKind::Event, event.id).await.unwrap().unwrap();

	assert_eq!(stored.fields.get("guests_phones"), Some(&json!(["5550001111"])));
}

#[tokio::test]
async fn update_with_unknown_field_writes_nothing() {
	let (service, store) = service();
	let owner = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", owner.id, "2026-06-21").await;
	let err = service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: event.id,
			fields: fields(&[("venue", json!("Garden")), ("theme", json!("retro"))]),
		})
		.await
		.unwrap_err();

	assert!(matches!(err, Error::SchemaMismatch { .. }));

	let stored = store.get(RecordKind::Event, event.id).await.unwrap().unwrap();

	assert!(!stored.fields.contains_key("venue"));
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() {
	let (service, _) = service();
	let err = service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: Uuid::new_v4(),
			fields: fields(&[("venue", json!("Garden"))]),
		})
		.await
		.unwrap_err();

	assert!(matches!(err, Error::NotFound { .. }));
}

/// A store whose set unions always fail, exposing that the scalar patch and
/// the set unions of one update are separate atomic operations.
struct FailingSets {
	inner: MemStore,
}

impl DocumentStore for FailingSets {
	fn insert<'a>(&'a self, doc: Document) -> BoxFuture<'a, festa_storage::Result<Document>> {
		self.inner.insert(doc)
	}

	fn get<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
	) -> BoxFuture<'a, festa_storage::Result<Option<Document>>> {
		self.inner.get(kind, id)
	}

	fn replace_fields<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		patch: Map<String, Value>,
	) -> BoxFuture<'a, festa_storage::Result<Option<Document>>> {
		self.inner.replace_fields(kind, id, patch)
	}

	fn add_to_set<'a>(
		&'a self,
		_kind: RecordKind,
		_id: Uuid,
		_field: &'a str,
		_values: Vec<Value>,
	) -> BoxFuture<'a, festa_storage::Result<Option<Document>>> {
		Box::pin(async {
			Err(festa_storage::Error::InvalidArgument("set union unavailable".to_string()))
		})
	}

	fn remove_from_set<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		field: &'a str,
		value: Value,
	) -> BoxFuture<'a, festa_storage::Result<Option<Document>>> {
		self.inner.remove_from_set(kind, id, field, value)
	}

	fn delete<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, festa_storage::Result<bool>> {
		self.inner.delete(kind, id)
	}

	fn find<'a>(
		&'a self,
		kind: RecordKind,
		filter: &'a FilterSpec,
		sort: &'a SortSpec,
	) -> BoxFuture<'a, festa_storage::Result<Vec<Document>>> {
		self.inner.find(kind, filter, sort)
	}
}

#[tokio::test]
async fn mixed_update_set_failure_keeps_scalar_change() {
	let store = Arc::new(FailingSets { inner: MemStore::new() });
	let cfg = festa_config::Config {
		service: festa_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: festa_config::Storage {
			postgres: festa_config::Postgres {
				dsn: "postgres://localhost/unused".to_string(),
				pool_max_conns: 1,
			},
		},
	};
	let service = FestaService::new(cfg, store.clone());
	let event = store
		.insert(Document::new(
			RecordKind::Event,
			fields(&[
				("name", json!("Solstice")),
				("user", json!(Uuid::new_v4().to_string())),
				("date", json!("2026-06-21")),
			]),
		))
		.await
		.unwrap();
	let err = service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: event.id,
			fields: fields(&[
				("venue", json!("Garden")),
				("guests_phones", json!(["5550001111"])),
			]),
		})
		.await
		.unwrap_err();

	assert!(matches!(err, Error::Validation { .. }));

	let stored = store.get(RecordKind::Event, event.id).await.unwrap().unwrap();

	// The scalar patch landed before the union failed and is not rolled back.
	assert_eq!(stored.str_field("venue"), Some("Garden"));
}

#[tokio::test]
async fn get_all_translates_comparators_and_sort() {
	let (service, _) = service();
	let owner = create_user(&service, "Ana", "ana@example.com", "5551234567").await;

	create_event(&service, "Spring", owner.id, "2026-04-01").await;
	create_event(&service, "Summer", owner.id, "2026-07-01").await;
	create_event(&service, "Autumn", owner.id, "2026-10-01").await;

	let mut params = BTreeMap::new();

	params.insert("date[gte]".to_string(), "2026-06-01".to_string());
	params.insert("sort".to_string(), "-date".to_string());

	let events = service.get_all(RecordKind::Event, &params).await.unwrap();
	let names = events.iter().filter_map(|event| event.str_field("name")).collect::<Vec<_>>();

	assert_eq!(names, ["Autumn", "Summer"]);
}

#[tokio::test]
async fn equality_filters_match_digit_string_fields() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;

	create_user(&service, "Rui", "rui@example.com", "5559876543").await;

	let mut params = BTreeMap::new();

	params.insert("phone".to_string(), "5551234567".to_string());

	let listed = service.get_all(RecordKind::User, &params).await.unwrap();

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, ana.id);
}

#[tokio::test]
async fn deactivated_users_read_as_absent() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui", "rui@example.com", "5559876543").await;

	service.deactivate(rui.id).await.unwrap();

	let listed = service.get_all(RecordKind::User, &BTreeMap::new()).await.unwrap();

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, ana.id);

	let err = service
		.get_one(GetOneRequest {
			kind: RecordKind::User,
			id: rui.id,
			include: Vec::new(),
			relations: Vec::new(),
		})
		.await
		.unwrap_err();

	assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn creating_an_event_links_the_owner() {
	let (service, store) = service();
	let owner = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", owner.id, "2026-06-21").await;
	let stored = store.get(RecordKind::User, owner.id).await.unwrap().unwrap();

	assert_eq!(stored.array_field("events_as_creator"), &[json!(event.id.to_string())]);
}

#[tokio::test]
async fn membership_unions_created_and_guest_events() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui", "rui@example.com", "5559876543").await;
	let created = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let guest_of = create_event(&service, "Harvest", rui.id, "2026-09-21").await;

	service
		.update(UpdateRequest {
			kind: RecordKind::User,
			id: ana.id,
			fields: fields(&[("events_as_guest", json!([guest_of.id.to_string()]))]),
		})
		.await
		.unwrap();

	let membership = service.resolve_membership(ana.id).await.unwrap();
	let expected: std::collections::BTreeSet<Uuid> = [created.id, guest_of.id].into_iter().collect();

	assert_eq!(membership, expected);

	let creator_only = service.resolve_membership(rui.id).await.unwrap();
	let expected: std::collections::BTreeSet<Uuid> = [guest_of.id].into_iter().collect();

	assert_eq!(creator_only, expected);
}

#[tokio::test]
async fn membership_of_unaffiliated_user_is_empty() {
	let (service, store) = service();
	let loner = store
		.insert(Document::new(
			RecordKind::User,
			fields(&[("name", json!("Noa")), ("email", json!("noa@example.com"))]),
		))
		.await
		.unwrap();
	let membership = service.resolve_membership(loner.id).await.unwrap();

	assert!(membership.is_empty());
}

#[tokio::test]
async fn search_scoped_to_one_event() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui", "rui@example.com", "5559876543").await;
	let solstice = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let harvest = create_event(&service, "Harvest", rui.id, "2026-09-21").await;
	let in_scope = create_post(&service, ana.id, solstice.id).await;

	create_post(&service, rui.id, harvest.id).await;

	let response = service
		.search(SearchRequest { event: Some(solstice.id), ..SearchRequest::default() })
		.await
		.unwrap();

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].id, in_scope.id);
	assert_eq!(response.items[0].author.id, ana.id);
}

#[tokio::test]
async fn search_matches_author_term_case_insensitively() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana Costa", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui Pires", "rui@example.com", "5559876543").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let by_ana = create_post(&service, ana.id, event.id).await;

	create_post(&service, rui.id, event.id).await;

	let response = service
		.search(SearchRequest {
			term: Some("ANA".to_string()),
			user: Some(ana.id),
			..SearchRequest::default()
		})
		.await
		.unwrap();

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].id, by_ana.id);
	assert_eq!(response.items[0].author.name.as_deref(), Some("Ana Costa"));

	let response = service
		.search(SearchRequest {
			term: Some("nobody".to_string()),
			user: Some(ana.id),
			..SearchRequest::default()
		})
		.await
		.unwrap();

	assert!(response.items.is_empty());
}

#[tokio::test]
async fn search_without_scope_is_empty() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;

	create_post(&service, ana.id, event.id).await;

	let response = service.search(SearchRequest::default()).await.unwrap();

	assert!(response.items.is_empty());
}

#[tokio::test]
async fn search_filters_posts_liked_by_a_user() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui", "rui@example.com", "5559876543").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let liked = create_post(&service, ana.id, event.id).await;

	create_post(&service, ana.id, event.id).await;
	service
		.update(UpdateRequest {
			kind: RecordKind::User,
			id: rui.id,
			fields: fields(&[("events_as_guest", json!([event.id.to_string()]))]),
		})
		.await
		.unwrap();
	service.like(liked.id, rui.id).await.unwrap();

	let response = service
		.search(SearchRequest { likes: Some(rui.id), ..SearchRequest::default() })
		.await
		.unwrap();

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].id, liked.id);
	assert_eq!(response.items[0].like_count, 1);
}

#[tokio::test]
async fn liking_your_own_post_is_forbidden() {
	let (service, store) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let post = create_post(&service, ana.id, event.id).await;
	let err = service.like(post.id, ana.id).await.unwrap_err();

	assert!(matches!(err, Error::Forbidden { .. }));

	let stored = store.get(RecordKind::Post, post.id).await.unwrap().unwrap();

	assert_eq!(stored.array_field("likes"), &[] as &[Value]);
}

#[tokio::test]
async fn like_and_unlike_round_trip() {
	let (service, store) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui", "rui@example.com", "5559876543").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let post = create_post(&service, ana.id, event.id).await;

	service.like(post.id, rui.id).await.unwrap();
	service.like(post.id, rui.id).await.unwrap();

	let stored = store.get(RecordKind::Post, post.id).await.unwrap().unwrap();

	assert_eq!(stored.array_field("likes"), &[json!(rui.id.to_string())]);

	service.unlike(post.id, rui.id).await.unwrap();

	let stored = store.get(RecordKind::Post, post.id).await.unwrap().unwrap();

	assert_eq!(stored.array_field("likes"), &[] as &[Value]);
}

#[tokio::test]
async fn guest_phone_matches_across_formatting() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;

	service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: event.id,
			fields: fields(&[("guests_phones", json!(["(555) 000-1111"]))]),
		})
		.await
		.unwrap();

	let hits = service.match_guest_phone("555.000.1111", None).await.unwrap();

	assert_eq!(hits.len(), 1);
	assert_eq!(hits[0].id, event.id);
	assert_eq!(hits[0].name.as_deref(), Some("Solstice"));

	let scoped = service.match_guest_phone("5550001111", Some(event.id)).await.unwrap();

	assert_eq!(scoped.len(), 1);

	let misses = service.match_guest_phone("5550009999", None).await.unwrap();

	assert!(misses.is_empty());

	let unparseable = service.match_guest_phone("not a number", None).await.unwrap();

	assert!(unparseable.is_empty());
}

#[tokio::test]
async fn linking_guest_events_replaces_the_set_wholesale() {
	let (service, store) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let rui = create_user(&service, "Rui", "rui@example.com", "5559876543").await;
	let stale = create_event(&service, "Past", rui.id, "2025-01-01").await;
	let current = create_event(&service, "Solstice", rui.id, "2026-06-21").await;

	service
		.update(UpdateRequest {
			kind: RecordKind::User,
			id: ana.id,
			fields: fields(&[("events_as_guest", json!([stale.id.to_string()]))]),
		})
		.await
		.unwrap();
	service
		.update(UpdateRequest {
			kind: RecordKind::Event,
			id: current.id,
			fields: fields(&[("guests_phones", json!(["555 123 4567"]))]),
		})
		.await
		.unwrap();

	let linked = service.link_guest_events(ana.id).await.unwrap();

	assert_eq!(linked, [current.id]);

	let stored = store.get(RecordKind::User, ana.id).await.unwrap().unwrap();

	assert_eq!(stored.array_field("events_as_guest"), &[json!(current.id.to_string())]);
}

#[tokio::test]
async fn get_one_expands_requested_relations() {
	let (service, _) = service();
	let ana = create_user(&service, "Ana", "ana@example.com", "5551234567").await;
	let event = create_event(&service, "Solstice", ana.id, "2026-06-21").await;
	let expanded = service
		.get_one(GetOneRequest {
			kind: RecordKind::User,
			id: ana.id,
			include: Vec::new(),
			relations: vec!["events_as_creator".to_string()],
		})
		.await
		.unwrap();
	let Some(Value::Array(summaries)) = expanded.fields.get("events_as_creator") else {
		panic!("expected an expanded relation array");
	};

	assert_eq!(summaries.len(), 1);
	assert_eq!(summaries[0].get("id"), Some(&json!(event.id.to_string())));
	assert_eq!(summaries[0].get("name"), Some(&json!("Solstice")));
}
