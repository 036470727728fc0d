use std::{cmp::Ordering, sync::Mutex};

use serde_json::{Map, Value};
use uuid::Uuid;

use festa_domain::schema::RecordKind;
use festa_storage::{
	Result,
	store::{
		BoxFuture, Comparator, Document, DocumentStore, FilterSpec, ID_FIELD, Predicate,
		SortDirection, SortSpec,
	},
};

/// In-memory `DocumentStore` for tests. Documents live in one insertion-ordered
/// vector, so the natural retrieval order is insertion order.
#[derive(Default)]
pub struct MemStore {
	docs: Mutex<Vec<Document>>,
}

impl MemStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn with_docs<T>(&self, f: impl FnOnce(&mut Vec<Document>) -> T) -> T {
		let mut docs = self.docs.lock().unwrap_or_else(|err| err.into_inner());

		f(&mut docs)
	}
}

impl DocumentStore for MemStore {
	fn insert<'a>(&'a self, doc: Document) -> BoxFuture<'a, Result<Document>> {
		let stored = doc.clone();

		Box::pin(async move {
			self.with_docs(|docs| docs.push(stored));

			Ok(doc)
		})
	}

	fn get<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(async move {
			Ok(self.with_docs(|docs| {
				docs.iter().find(|doc| doc.kind == kind && doc.id == id).cloned()
			}))
		})
	}

	fn replace_fields<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		patch: Map<String, Value>,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(async move {
			Ok(self.with_docs(|docs| {
				let doc = docs.iter_mut().find(|doc| doc.kind == kind && doc.id == id)?;

				for (key, value) in patch {
					doc.fields.insert(key, value);
				}

				Some(doc.clone())
			}))
		})
	}

	fn add_to_set<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		field: &'a str,
		values: Vec<Value>,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(async move {
			Ok(self.with_docs(|docs| {
				let doc = docs.iter_mut().find(|doc| doc.kind == kind && doc.id == id)?;
				let entry = doc
					.fields
					.entry(field.to_string())
					.or_insert_with(|| Value::Array(Vec::new()));

				if !entry.is_array() {
					*entry = Value::Array(Vec::new());
				}
				if let Value::Array(members) = entry {
					for value in values {
						if !members.contains(&value) {
							members.push(value);
						}
					}
				}

				Some(doc.clone())
			}))
		})
	}

	fn remove_from_set<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		field: &'a str,
		value: Value,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(async move {
			Ok(self.with_docs(|docs| {
				let doc = docs.iter_mut().find(|doc| doc.kind == kind && doc.id == id)?;

				if let Some(Value::Array(members)) = doc.fields.get_mut(field) {
					members.retain(|member| member != &value);
				}

				Some(doc.clone())
			}))
		})
	}

	fn delete<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(self.with_docs(|docs| {
				let before = docs.len();

				docs.retain(|doc| !(doc.kind == kind && doc.id == id));

				docs.len() < before
			}))
		})
	}

	fn find<'a>(
		&'a self,
		kind: RecordKind,
		filter: &'a FilterSpec,
		sort: &'a SortSpec,
	) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(async move {
			let mut matches = self.with_docs(|docs| {
				docs.iter()
					.filter(|doc| {
						doc.kind == kind
							&& filter.predicates.iter().all(|predicate| eval(doc, predicate))
					})
					.cloned()
					.collect::<Vec<_>>()
			});

			if !sort.keys.is_empty() {
				matches.sort_by(|a, b| compare_by_keys(a, b, &sort.keys));
			}

			Ok(matches)
		})
	}
}

fn eval(doc: &Document, predicate: &Predicate) -> bool {
	if predicate.field == ID_FIELD {
		return eval_id(doc, predicate);
	}

	let stored = doc.fields.get(&predicate.field);

	match predicate.cmp {
		Comparator::Eq => stored == Some(&predicate.value),
		Comparator::Ne => stored != Some(&predicate.value),
		Comparator::Gt => relational(stored, &predicate.value, Ordering::Greater, false),
		Comparator::Gte => relational(stored, &predicate.value, Ordering::Greater, true),
		Comparator::Lt => relational(stored, &predicate.value, Ordering::Less, false),
		Comparator::Lte => relational(stored, &predicate.value, Ordering::Less, true),
		Comparator::In => match &predicate.value {
			Value::Array(items) => stored.map(|value| items.contains(value)).unwrap_or(false),
			_ => false,
		},
		Comparator::Contains => match stored {
			Some(Value::Array(members)) => members.contains(&predicate.value),
			_ => false,
		},
	}
}

fn eval_id(doc: &Document, predicate: &Predicate) -> bool {
	let id = doc.id.to_string();

	match predicate.cmp {
		Comparator::Eq => predicate.value.as_str() == Some(id.as_str()),
		Comparator::In => match &predicate.value {
			Value::Array(items) => items.iter().any(|item| item.as_str() == Some(id.as_str())),
			_ => false,
		},
		_ => false,
	}
}

fn relational(stored: Option<&Value>, wanted: &Value, ordering: Ordering, or_equal: bool) -> bool {
	let Some(stored) = stored else {
		return false;
	};
	let Some(compared) = compare_values(stored, wanted) else {
		return false;
	};

	compared == ordering || (or_equal && compared == Ordering::Equal)
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
	if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
		return a.partial_cmp(&b);
	}
	if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
		return Some(a.cmp(b));
	}

	None
}

fn compare_by_keys(a: &Document, b: &Document, keys: &[(String, SortDirection)]) -> Ordering {
	for (key, direction) in keys {
		let left = a.fields.get(key);
		let right = b.fields.get(key);
		let ordering = match (left, right) {
			(Some(left), Some(right)) =>
				compare_values(left, right).unwrap_or(Ordering::Equal),
			(Some(_), None) => Ordering::Less,
			(None, Some(_)) => Ordering::Greater,
			(None, None) => Ordering::Equal,
		};
		let ordering = match direction {
			SortDirection::Asc => ordering,
			SortDirection::Desc => ordering.reverse(),
		};

		if ordering != Ordering::Equal {
			return ordering;
		}
	}

	Ordering::Equal
}
