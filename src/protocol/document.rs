//! Dotted-path lookup over document values
//!
//! Walks a `serde_json::Value` one path segment at a time. Objects are
//! indexed by key, arrays by numeric segment. Anything else ends the walk
//! with [`FieldLookup::Absent`].

use serde_json::Value;

/// Outcome of a path lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldLookup<'a> {
    /// The path resolved to a value
    Present(&'a Value),
    /// Some segment of the path did not exist
    Absent,
}

impl<'a> FieldLookup<'a> {
    /// Whether the path was missing
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldLookup::Absent)
    }

    /// Owned value, with `Absent` rendered as JSON `null`
    pub fn into_value(self) -> Value {
        match self {
            FieldLookup::Present(value) => value.clone(),
            FieldLookup::Absent => Value::Null,
        }
    }
}

/// Resolve `path` (e.g. `"author.address.city"`) inside `document`
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> FieldLookup<'a> {
    let mut current = document;

    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        match next {
            Some(value) => current = value,
            None => return FieldLookup::Absent,
        }
    }

    FieldLookup::Present(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_object_path() {
        let doc = json!({"author": {"address": {"city": "Lyon"}}});
        assert_eq!(
            resolve_path(&doc, "author.address.city"),
            FieldLookup::Present(&json!("Lyon"))
        );
    }

    #[test]
    fn test_array_segment() {
        let doc = json!({"tags": ["a", "b"]});
        assert_eq!(resolve_path(&doc, "tags.1").into_value(), json!("b"));
        assert!(resolve_path(&doc, "tags.9").is_absent());
        assert!(resolve_path(&doc, "tags.first").is_absent());
    }

    #[test]
    fn test_missing_intermediate_is_absent() {
        let doc = json!({"author": "plain string"});
        assert!(resolve_path(&doc, "author.name").is_absent());
        assert!(resolve_path(&doc, "nobody.name").is_absent());
        assert_eq!(resolve_path(&doc, "nobody").into_value(), Value::Null);
    }

    #[test]
    fn test_explicit_null_is_present() {
        let doc = json!({"deleted_at": null});
        assert_eq!(resolve_path(&doc, "deleted_at"), FieldLookup::Present(&Value::Null));
    }
}
