use serde_json::{Map, Value, json};

use festa_config::Postgres;
use festa_domain::schema::RecordKind;
use festa_storage::{
	db::Db,
	pg::PgStore,
	store::{Comparator, Document, DocumentStore, FilterSpec, SortSpec},
};
use festa_testkit::TestDatabase;

fn object(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => panic!("Expected a JSON object."),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FESTA_PG_DSN to run."]
async fn documents_table_exists_after_bootstrap() {
	let Some(base_dsn) = festa_testkit::env_dsn() else {
		eprintln!("Skipping documents_table_exists_after_bootstrap; set FESTA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name = 'documents'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FESTA_PG_DSN to run."]
async fn add_to_set_unions_without_duplicates() {
	let Some(base_dsn) = festa_testkit::env_dsn() else {
		eprintln!("Skipping add_to_set_unions_without_duplicates; set FESTA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let store = PgStore::new(db.pool.clone());
	let doc = Document::new(RecordKind::Post, object(json!({ "likes": ["a", "b"] })));
	let id = doc.id;

	store.insert(doc).await.expect("Failed to insert document.");

	let updated = store
		.add_to_set(RecordKind::Post, id, "likes", vec![json!("b"), json!("c")])
		.await
		.expect("Failed to add to set.")
		.expect("Document should exist.");

	assert_eq!(updated.array_field("likes"), [json!("a"), json!("b"), json!("c")]);

	let again = store
		.add_to_set(RecordKind::Post, id, "likes", vec![json!("c")])
		.await
		.expect("Failed to add to set.")
		.expect("Document should exist.");

	assert_eq!(again.array_field("likes"), updated.array_field("likes"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FESTA_PG_DSN to run."]
async fn find_applies_relational_predicates_and_sort() {
	let Some(base_dsn) = festa_testkit::env_dsn() else {
		eprintln!("Skipping find_applies_relational_predicates_and_sort; set FESTA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let store = PgStore::new(db.pool.clone());

	for (name, date) in
		[("ana", "2026-05-01"), ("bia", "2026-06-01"), ("cora", "2026-07-01")]
	{
		let doc = Document::new(
			RecordKind::Event,
			object(json!({ "name": name, "date": date, "user": "u" })),
		);

		store.insert(doc).await.expect("Failed to insert document.");
	}

	let mut filter = FilterSpec::new();

	filter.push("date", Comparator::Gte, json!("2026-06-01"));

	let sort = SortSpec {
		keys: vec![("date".to_string(), festa_storage::store::SortDirection::Desc)],
	};
	let found = store.find(RecordKind::Event, &filter, &sort).await.expect("Failed to find.");
	let names: Vec<_> = found.iter().filter_map(|doc| doc.str_field("name")).collect();

	assert_eq!(names, ["cora", "bia"]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
