use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::Result;
use festa_domain::schema::RecordKind;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Predicates on this field target the document identifier instead of a
/// payload field.
pub const ID_FIELD: &str = "id";

/// A loosely-typed record owned by the store. The service receives,
/// transforms, and returns documents per call; it never keeps long-lived
/// references to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
	pub id: Uuid,
	pub kind: RecordKind,
	pub fields: Map<String, Value>,
}

impl Document {
	pub fn new(kind: RecordKind, fields: Map<String, Value>) -> Self {
		Self { id: Uuid::new_v4(), kind, fields }
	}

	pub fn str_field(&self, name: &str) -> Option<&str> {
		self.fields.get(name).and_then(Value::as_str)
	}

	pub fn array_field(&self, name: &str) -> &[Value] {
		self.fields.get(name).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
	Eq,
	Ne,
	Gt,
	Gte,
	Lt,
	Lte,
	/// Scalar field value is a member of the given array.
	In,
	/// Array field contains the given value.
	Contains,
}

#[derive(Debug, Clone)]
pub struct Predicate {
	pub field: String,
	pub cmp: Comparator,
	pub value: Value,
}

/// Ordered conjunction of predicates. `Eq` on a missing field never matches;
/// `Ne` on a missing field matches, which the active-user filter depends on.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
	pub predicates: Vec<Predicate>,
}

impl FilterSpec {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, field: impl Into<String>, cmp: Comparator, value: Value) -> &mut Self {
		self.predicates.push(Predicate { field: field.into(), cmp, value });

		self
	}

	pub fn eq(field: impl Into<String>, value: Value) -> Self {
		let mut spec = Self::new();

		spec.push(field, Comparator::Eq, value);

		spec
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
	Asc,
	Desc,
}

#[derive(Debug, Clone, Default)]
pub struct SortSpec {
	pub keys: Vec<(String, SortDirection)>,
}

impl SortSpec {
	pub fn none() -> Self {
		Self::default()
	}
}

/// The per-operation-atomic document store the core builds on. Each call is
/// atomic on its own; sequences of calls are not transactional.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	fn insert<'a>(&'a self, doc: Document) -> BoxFuture<'a, Result<Document>>;

	fn get<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, Result<Option<Document>>>;

	/// Merges the patch into the document's fields, overwriting named fields
	/// wholesale. Returns the updated document, or `None` when the target
	/// does not exist.
	fn replace_fields<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		patch: Map<String, Value>,
	) -> BoxFuture<'a, Result<Option<Document>>>;

	/// Unions the values into the named array field, dropping exact
	/// duplicates and preserving the order of first appearance. Existing
	/// members are never removed.
	fn add_to_set<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		field: &'a str,
		values: Vec<Value>,
	) -> BoxFuture<'a, Result<Option<Document>>>;

	fn remove_from_set<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		field: &'a str,
		value: Value,
	) -> BoxFuture<'a, Result<Option<Document>>>;

	fn delete<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, Result<bool>>;

	/// Retrieves documents of the kind matching every predicate, ordered by
	/// the sort keys. Without sort keys the retrieval order is the store's
	/// natural order and carries no guarantee.
	fn find<'a>(
		&'a self,
		kind: RecordKind,
		filter: &'a FilterSpec,
		sort: &'a SortSpec,
	) -> BoxFuture<'a, Result<Vec<Document>>>;
}
