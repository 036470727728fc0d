use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, Result};
use festa_domain::schema::{self, RecordKind};
use festa_storage::store::{Comparator, FilterSpec, SortDirection, SortSpec};

/// Request keys that carry paging or formatting directives and never become
/// filter predicates.
pub const EXCLUDED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

const SORT_KEY: &str = "sort";

#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
	pub filter: FilterSpec,
	pub sort: SortSpec,
}

/// Translates untyped request parameters into a validated filter and ordering
/// specification. Keys may carry a bracketed comparator suffix
/// (`date[gte]=2026-06-01`); the dedicated `sort` key lists comma-separated
/// field names, each optionally prefixed with `-` for descending order.
/// Pure transformation; the store consumes the result.
pub fn build_query(kind: RecordKind, params: &BTreeMap<String, String>) -> Result<QuerySpec> {
	let mut spec = QuerySpec::default();

	for (key, raw) in params {
		let (field, cmp) = parse_key(key)?;

		if EXCLUDED_KEYS.contains(&field) {
			continue;
		}
		if schema::field_kind(kind, field).is_none() {
			return Err(Error::schema_mismatch(kind, field));
		}

		// Equality keeps the raw string: digit-string fields such as phone
		// numbers must compare as text. Relational comparators coerce so
		// numeric fields order numerically.
		let value = match cmp {
			Comparator::Gt | Comparator::Gte | Comparator::Lt | Comparator::Lte =>
				coerce_value(raw),
			_ => Value::String(raw.clone()),
		};

		spec.filter.push(field, cmp, value);
	}
	if let Some(raw) = params.get(SORT_KEY) {
		spec.sort = parse_sort(kind, raw)?;
	}

	Ok(spec)
}

fn parse_key(key: &str) -> Result<(&str, Comparator)> {
	let Some((field, rest)) = key.split_once('[') else {
		return Ok((key, Comparator::Eq));
	};
	let Some(token) = rest.strip_suffix(']') else {
		return Err(Error::validation(format!("Malformed filter key '{key}'.")));
	};
	let cmp = match token {
		"eq" => Comparator::Eq,
		"ne" => Comparator::Ne,
		"gt" => Comparator::Gt,
		"gte" => Comparator::Gte,
		"lt" => Comparator::Lt,
		"lte" => Comparator::Lte,
		_ => {
			return Err(Error::validation(format!(
				"Unrecognized filter operator '{token}' in key '{key}'."
			)));
		},
	};

	Ok((field, cmp))
}

fn parse_sort(kind: RecordKind, raw: &str) -> Result<SortSpec> {
	let mut sort = SortSpec::none();

	for part in raw.split(',') {
		let part = part.trim();

		if part.is_empty() {
			continue;
		}

		let (field, direction) = match part.strip_prefix('-') {
			Some(field) => (field, SortDirection::Desc),
			None => (part, SortDirection::Asc),
		};

		if !schema::sortable_fields(kind).contains(&field) {
			return Err(Error::validation(format!(
				"'{field}' is not a sortable field for {}.",
				kind.as_str()
			)));
		}

		sort.keys.push((field.to_string(), direction));
	}

	Ok(sort)
}

/// Relational comparands: numeric-looking parameters become JSON numbers so
/// the store compares them numerically; booleans likewise; everything else
/// stays a string.
fn coerce_value(raw: &str) -> Value {
	if let Ok(number) = raw.parse::<i64>() {
		return Value::from(number);
	}
	if let Ok(number) = raw.parse::<f64>() {
		return Value::from(number);
	}

	match raw {
		"true" => Value::Bool(true),
		"false" => Value::Bool(false),
		_ => Value::String(raw.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}

	#[test]
	fn plain_keys_become_equality_predicates() {
		let spec = build_query(RecordKind::Event, &params(&[("venue", "garden")])).unwrap();

		assert_eq!(spec.filter.predicates.len(), 1);
		assert_eq!(spec.filter.predicates[0].field, "venue");
		assert_eq!(spec.filter.predicates[0].cmp, Comparator::Eq);
		assert_eq!(spec.filter.predicates[0].value, Value::String("garden".to_string()));
	}

	#[test]
	fn bracketed_operators_map_to_comparators() {
		let spec = build_query(RecordKind::Event, &params(&[("date[gte]", "2026-06-01")])).unwrap();

		assert_eq!(spec.filter.predicates[0].cmp, Comparator::Gte);

		let spec = build_query(RecordKind::Event, &params(&[("date[ne]", "2026-06-01")])).unwrap();

		assert_eq!(spec.filter.predicates[0].cmp, Comparator::Ne);
	}

	#[test]
	fn unrecognized_operator_fails_validation() {
		let err = build_query(RecordKind::Event, &params(&[("date[within]", "x")])).unwrap_err();

		assert!(matches!(err, Error::Validation { .. }));
	}

	#[test]
	fn meta_keys_are_never_predicates() {
		let spec = build_query(
			RecordKind::Event,
			&params(&[("page", "2"), ("limit", "10"), ("fields", "name"), ("venue", "garden")]),
		)
		.unwrap();

		assert_eq!(spec.filter.predicates.len(), 1);
		assert_eq!(spec.filter.predicates[0].field, "venue");
	}

	#[test]
	fn sort_parses_directions_in_order() {
		let spec = build_query(RecordKind::Event, &params(&[("sort", "-date,name")])).unwrap();

		assert_eq!(
			spec.sort.keys,
			[
				("date".to_string(), SortDirection::Desc),
				("name".to_string(), SortDirection::Asc)
			]
		);
	}

	#[test]
	fn sort_rejects_fields_outside_the_allow_list() {
		let err = build_query(RecordKind::Event, &params(&[("sort", "venue")])).unwrap_err();

		assert!(matches!(err, Error::Validation { .. }));
	}

	#[test]
	fn unknown_filter_field_is_a_schema_mismatch() {
		let err = build_query(RecordKind::Event, &params(&[("nope", "x")])).unwrap_err();

		assert!(matches!(err, Error::SchemaMismatch { .. }));
	}

	#[test]
	fn relational_values_coerce_to_numbers() {
		let spec = build_query(RecordKind::User, &params(&[("name[gt]", "42")])).unwrap();

		assert_eq!(spec.filter.predicates[0].value, Value::from(42));
	}

	#[test]
	fn equality_values_stay_strings() {
		let spec = build_query(RecordKind::User, &params(&[("phone", "5551234567")])).unwrap();

		assert_eq!(spec.filter.predicates[0].value, Value::String("5551234567".to_string()));

		let spec = build_query(RecordKind::User, &params(&[("phone[ne]", "5551234567")])).unwrap();

		assert_eq!(spec.filter.predicates[0].value, Value::String("5551234567".to_string()));
	}
}
