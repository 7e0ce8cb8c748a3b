//! Sort specification normalization
//!
//! Accepted shapes, all reduced to an ordered field list:
//!
//! - `"field"`
//! - `["a", {"b": "desc"}, {"c": {"order": "asc"}}]`
//! - `{"a": "asc", "b": "desc"}` (key order is kept)
//!
//! Anything else, or an empty list, is rejected instead of guessing.

use serde_json::Value;

use super::errors::{SearchError, SearchResult};

/// Field name that refers to the hit identifier rather than its body
pub const ID_FIELD: &str = "_id";

/// Ordered sort fields of `sort`
pub fn sort_fields(sort: &Value) -> SearchResult<Vec<String>> {
    let fields = match sort {
        Value::String(field) => vec![field.clone()],
        Value::Array(items) => items
            .iter()
            .map(array_entry)
            .collect::<SearchResult<Vec<_>>>()?,
        Value::Object(map) => map.keys().cloned().collect(),
        other => {
            return Err(SearchError::ambiguous_sort(format!(
                "expected a field name, a list or a map, got {}",
                other
            )))
        }
    };

    if fields.is_empty() {
        return Err(SearchError::ambiguous_sort("sort specification is empty"));
    }
    if fields.iter().any(String::is_empty) {
        return Err(SearchError::ambiguous_sort("sort field name is empty"));
    }

    Ok(fields)
}

fn array_entry(entry: &Value) -> SearchResult<String> {
    match entry {
        Value::String(field) => Ok(field.clone()),
        Value::Object(map) if map.len() == 1 => Ok(map.keys().cloned().collect()),
        other => Err(SearchError::ambiguous_sort(format!(
            "sort entries must be a field name or a single-key map, got {}",
            other
        ))),
    }
}
