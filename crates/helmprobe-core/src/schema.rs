//! Leaf value paths declared by a chart's `values.schema.json`
//!
//! The walk visits every declared property, whether or not any values set it,
//! including properties declared in `allOf`/`anyOf`/`oneOf` and `if`/`then`/`else`
//! branches.
//! Visiting `image.pullPolicy` evicts `image`, so only leaf paths remain, which
//! is the same shape [`crate::scraper::scan`] produces from templates.

use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Read a schema file and return its leaf property paths
///
/// An empty (or whitespace-only) file declares nothing.
pub fn read_leaf_paths(schema_file: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let schema_file = schema_file.as_ref();
    if !schema_file.is_file() {
        return Err(CoreError::SchemaFileNotFound {
            path: std::path::absolute(schema_file).unwrap_or_else(|_| schema_file.to_path_buf()),
        });
    }

    let content = std::fs::read_to_string(schema_file).map_err(|source| CoreError::ReadFile {
        path: schema_file.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(BTreeSet::new());
    }

    let schema: JsonValue = serde_json::from_str(&content)?;
    let paths = leaf_paths(&schema)?;
    tracing::debug!("{}: {} leaf value path(s)", schema_file.display(), paths.len());
    Ok(paths)
}

/// Leaf property paths of an already-parsed Draft 7 schema
pub fn leaf_paths(schema: &JsonValue) -> Result<BTreeSet<String>> {
    let mut walker = SchemaWalker {
        root: schema,
        paths: BTreeSet::new(),
        errors: Vec::new(),
        active_refs: Vec::new(),
    };

    if let Err(e) = jsonschema::draft7::new(schema) {
        walker.errors.push(format!("Invalid schema: {}", e));
    }
    walker.walk(schema, "");

    if walker.errors.is_empty() {
        Ok(walker.paths)
    } else {
        Err(CoreError::SchemaWalk {
            errors: walker.errors,
        })
    }
}

const SUBSCHEMA_LISTS: &[&str] = &["allOf", "anyOf", "oneOf"];
const SUBSCHEMAS: &[&str] = &["if", "then", "else"];

struct SchemaWalker<'s> {
    root: &'s JsonValue,
    paths: BTreeSet<String>,
    errors: Vec<String>,
    /// `$ref`s currently being expanded, innermost last
    active_refs: Vec<&'s str>,
}

impl<'s> SchemaWalker<'s> {
    fn walk(&mut self, node: &'s JsonValue, prefix: &str) {
        // In Draft 7, `$ref` replaces every sibling keyword
        if let Some(reference) = node.get("$ref").and_then(JsonValue::as_str) {
            self.follow(reference, prefix);
            return;
        }

        match node.get("properties") {
            None => {}
            Some(JsonValue::Object(properties)) => {
                for (name, property) in properties {
                    let path = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{}.{}", prefix, name)
                    };

                    self.paths.insert(path.clone());
                    self.paths.remove(prefix);
                    self.walk(property, &path);
                }
            }
            Some(_) => self.errors.push(format!(
                "'properties' at '{}' must be an object",
                display_path(prefix)
            )),
        }

        // Subschemas combined into this one declare properties at the same level
        for keyword in SUBSCHEMA_LISTS {
            if let Some(JsonValue::Array(subschemas)) = node.get(*keyword) {
                for subschema in subschemas {
                    self.walk(subschema, prefix);
                }
            }
        }
        for keyword in SUBSCHEMAS {
            if let Some(subschema) = node.get(*keyword) {
                self.walk(subschema, prefix);
            }
        }
    }

    fn follow(&mut self, reference: &'s str, prefix: &str) {
        let Some(pointer) = reference.strip_prefix('#') else {
            self.errors.push(format!(
                "Cannot follow non-local $ref '{}' at '{}'",
                reference,
                display_path(prefix)
            ));
            return;
        };

        if self.active_refs.contains(&reference) {
            self.errors.push(format!(
                "Cyclic $ref '{}' at '{}'",
                reference,
                display_path(prefix)
            ));
            return;
        }

        let Some(target) = self.root.pointer(pointer) else {
            self.errors.push(format!(
                "Unresolvable $ref '{}' at '{}'",
                reference,
                display_path(prefix)
            ));
            return;
        };

        self.active_refs.push(reference);
        self.walk(target, prefix);
        self.active_refs.pop();
    }
}

fn display_path(prefix: &str) -> &str {
    if prefix.is_empty() { "<root>" } else { prefix }
}
