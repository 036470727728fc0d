use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
	Error, Result,
	store::{
		BoxFuture, Comparator, Document, DocumentStore, FilterSpec, ID_FIELD, SortDirection,
		SortSpec,
	},
};
use festa_domain::schema::RecordKind;

/// Document store backed by a single JSONB table. Every trait operation maps
/// to one SQL statement, so the store's per-call atomicity guarantee is
/// Postgres's per-statement atomicity.
pub struct PgStore {
	pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct DocRow {
	id: Uuid,
	fields: Value,
}

impl PgStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	fn row_to_document(kind: RecordKind, row: DocRow) -> Document {
		let fields = match row.fields {
			Value::Object(map) => map,
			_ => Map::new(),
		};

		Document { id: row.id, kind, fields }
	}
}

impl DocumentStore for PgStore {
	fn insert<'a>(&'a self, doc: Document) -> BoxFuture<'a, Result<Document>> {
		Box::pin(async move {
			sqlx::query("INSERT INTO documents (id, kind, fields) VALUES ($1, $2, $3)")
				.bind(doc.id)
				.bind(doc.kind.as_str())
				.bind(Value::Object(doc.fields.clone()))
				.execute(&self.pool)
				.await?;

			Ok(doc)
		})
	}

	fn get<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(async move {
			let row = sqlx::query_as::<_, DocRow>(
				"SELECT id, fields FROM documents WHERE kind = $1 AND id = $2 LIMIT 1",
			)
			.bind(kind.as_str())
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(|row| Self::row_to_document(kind, row)))
		})
	}

	fn replace_fields<'a>(
		&'a self,
		kind: RecordKind,
		id: Uuid,
		patch: Map<String, Value>,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		Box::pin(async move {
			let row = sqlx::query_as::<_, DocRow>(
				"\
UPDATE documents
SET fields = fields || $3, updated_at = now()
WHERE kind = $1 AND id = $2
RETURNING id, fields",
			)
			.bind(kind.as_str())
			.bind(id)
			.bind(Value::Object(patch))
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(|row| Self::row_to_document(kind, row)))
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
			// Deduplicates by first appearance so existing members keep their
			// position and new members append, matching add-to-set semantics.
			let row = sqlx::query_as::<_, DocRow>(
				"\
UPDATE documents
SET fields = jsonb_set(fields, ARRAY[$3], COALESCE((
	SELECT jsonb_agg(elem ORDER BY ord)
	FROM (
		SELECT elem, min(ord) AS ord
		FROM jsonb_array_elements(COALESCE(fields->$3, '[]'::jsonb) || $4)
			WITH ORDINALITY AS t(elem, ord)
		GROUP BY elem
	) AS dedup
), '[]'::jsonb)), updated_at = now()
WHERE kind = $1 AND id = $2
RETURNING id, fields",
			)
			.bind(kind.as_str())
			.bind(id)
			.bind(field)
			.bind(Value::Array(values))
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(|row| Self::row_to_document(kind, row)))
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
			let row = sqlx::query_as::<_, DocRow>(
				"\
UPDATE documents
SET fields = jsonb_set(fields, ARRAY[$3], COALESCE((
	SELECT jsonb_agg(elem ORDER BY ord)
	FROM jsonb_array_elements(COALESCE(fields->$3, '[]'::jsonb))
		WITH ORDINALITY AS t(elem, ord)
	WHERE elem <> $4
), '[]'::jsonb)), updated_at = now()
WHERE kind = $1 AND id = $2
RETURNING id, fields",
			)
			.bind(kind.as_str())
			.bind(id)
			.bind(field)
			.bind(value)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(|row| Self::row_to_document(kind, row)))
		})
	}

	fn delete<'a>(&'a self, kind: RecordKind, id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let result = sqlx::query("DELETE FROM documents WHERE kind = $1 AND id = $2")
				.bind(kind.as_str())
				.bind(id)
				.execute(&self.pool)
				.await?;

			Ok(result.rows_affected() > 0)
		})
	}

	fn find<'a>(
		&'a self,
		kind: RecordKind,
		filter: &'a FilterSpec,
		sort: &'a SortSpec,
	) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(async move {
			let mut builder: QueryBuilder<'_, Postgres> =
				QueryBuilder::new("SELECT id, fields FROM documents WHERE kind = ");

			builder.push_bind(kind.as_str());

			for predicate in &filter.predicates {
				push_predicate(&mut builder, predicate)?;
			}

			for (index, (key, direction)) in sort.keys.iter().enumerate() {
				builder.push(if index == 0 { " ORDER BY fields->>" } else { ", fields->>" });
				builder.push_bind(key.as_str());
				builder.push(match direction {
					SortDirection::Asc => " ASC",
					SortDirection::Desc => " DESC",
				});
			}

			let rows: Vec<DocRow> = builder.build_query_as().fetch_all(&self.pool).await?;

			Ok(rows.into_iter().map(|row| Self::row_to_document(kind, row)).collect())
		})
	}
}

fn push_predicate<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	predicate: &'a crate::store::Predicate,
) -> Result<()> {
	if predicate.field == ID_FIELD {
		return push_id_predicate(builder, predicate);
	}

	match predicate.cmp {
		Comparator::Eq => {
			builder.push(" AND fields->");
			builder.push_bind(predicate.field.as_str());
			builder.push(" = ");
			builder.push_bind(predicate.value.clone());
		},
		Comparator::Ne => {
			builder.push(" AND fields->");
			builder.push_bind(predicate.field.as_str());
			builder.push(" IS DISTINCT FROM ");
			builder.push_bind(predicate.value.clone());
		},
		Comparator::Gt => push_relational(builder, predicate, " > "),
		Comparator::Gte => push_relational(builder, predicate, " >= "),
		Comparator::Lt => push_relational(builder, predicate, " < "),
		Comparator::Lte => push_relational(builder, predicate, " <= "),
		Comparator::In => {
			let items = in_list_text(&predicate.value)?;

			builder.push(" AND fields->>");
			builder.push_bind(predicate.field.as_str());
			builder.push(" = ANY(");
			builder.push_bind(items);
			builder.push(")");
		},
		Comparator::Contains => {
			builder.push(" AND fields->");
			builder.push_bind(predicate.field.as_str());
			builder.push(" @> ");
			builder.push_bind(Value::Array(vec![predicate.value.clone()]));
		},
	}

	Ok(())
}

fn push_id_predicate<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	predicate: &'a crate::store::Predicate,
) -> Result<()> {
	match predicate.cmp {
		Comparator::Eq => {
			builder.push(" AND id = ");
			builder.push_bind(parse_id(&predicate.value)?);
		},
		Comparator::In => {
			let Value::Array(items) = &predicate.value else {
				return Err(Error::InvalidArgument(
					"In predicate requires an array value.".to_string(),
				));
			};
			let ids = items.iter().map(parse_id).collect::<Result<Vec<Uuid>>>()?;

			builder.push(" AND id = ANY(");
			builder.push_bind(ids);
			builder.push(")");
		},
		_ => {
			return Err(Error::InvalidArgument(
				"Only equality and membership predicates apply to the id field.".to_string(),
			));
		},
	}

	Ok(())
}

fn push_relational<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	predicate: &'a crate::store::Predicate,
	operator: &'static str,
) {
	// Numbers compare numerically, everything else as text. Date strings are
	// RFC 3339 so their text order is their chronological order.
	if let Some(number) = predicate.value.as_f64() {
		builder.push(" AND (fields->>");
		builder.push_bind(predicate.field.as_str());
		builder.push(")::numeric");
		builder.push(operator);
		builder.push_bind(number);
	} else {
		builder.push(" AND fields->>");
		builder.push_bind(predicate.field.as_str());
		builder.push(operator);
		builder.push_bind(predicate.value.as_str().map(str::to_string).unwrap_or_else(|| {
			predicate.value.to_string()
		}));
	}
}

fn in_list_text(value: &Value) -> Result<Vec<String>> {
	let Value::Array(items) = value else {
		return Err(Error::InvalidArgument("In predicate requires an array value.".to_string()));
	};

	Ok(items
		.iter()
		.map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
		.collect())
}

fn parse_id(value: &Value) -> Result<Uuid> {
	value
		.as_str()
		.and_then(|raw| Uuid::parse_str(raw).ok())
		.ok_or_else(|| Error::InvalidArgument("id predicate value is not a UUID.".to_string()))
}
