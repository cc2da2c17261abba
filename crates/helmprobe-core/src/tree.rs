//! Dotted-path navigation over untyped YAML/JSON trees
//!
//! Rendered documents are kept as `serde_json::Value` trees alongside their
//! typed form. This module provides the lookups used against those trees:
//! `spec.template.spec.containers` walks through maps only, and any non-map
//! intermediate segment makes the whole lookup absent.

use serde_json::{Map, Value as JsonValue};

/// Lookups by dot-separated path.
///
/// An empty (or blank) path denotes the value itself. Typed accessors return
/// `None` when the value exists but has a different shape.
pub trait NestedValue {
    /// Value at `path`, if every intermediate segment is a map containing the key
    fn nested(&self, path: &str) -> Option<&JsonValue>;

    /// String at `path`
    fn nested_str(&self, path: &str) -> Option<&str> {
        self.nested(path).and_then(JsonValue::as_str)
    }

    /// List at `path`
    fn nested_array(&self, path: &str) -> Option<&Vec<JsonValue>> {
        self.nested(path).and_then(JsonValue::as_array)
    }

    /// Map at `path`
    fn nested_object(&self, path: &str) -> Option<&Map<String, JsonValue>> {
        self.nested(path).and_then(JsonValue::as_object)
    }
}

impl NestedValue for JsonValue {
    fn nested(&self, path: &str) -> Option<&JsonValue> {
        if path.trim().is_empty() {
            return Some(self);
        }

        let mut current = self;
        for key in path.split('.') {
            match current {
                JsonValue::Object(map) => current = map.get(key)?,
                _ => return None,
            }
        }

        // YAML `key:` with no value parses as null; treat it as absent
        (!current.is_null()).then_some(current)
    }
}

impl NestedValue for Map<String, JsonValue> {
    fn nested(&self, path: &str) -> Option<&JsonValue> {
        // No owned `JsonValue` exists for a bare map, so the root is not addressable
        if path.trim().is_empty() {
            return None;
        }

        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, rest),
            None => (path, ""),
        };
        let value = self.get(head)?;
        if rest.is_empty() {
            (!value.is_null()).then_some(value)
        } else {
            value.nested(rest)
        }
    }
}

/// Iterate the map-shaped entries of a list, skipping anything else
pub fn object_entries(list: Option<&Vec<JsonValue>>) -> impl Iterator<Item = &Map<String, JsonValue>> {
    list.into_iter().flatten().filter_map(JsonValue::as_object)
}
