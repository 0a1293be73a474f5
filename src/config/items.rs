//! Named ordered collections (playbooks, profiles) resolved across layers.
//!
//! A section is a mapping of item name to `{path, parameters, skip}`:
//!
//! ```yaml
//! playbooks:
//!   10_base_system:
//!     path: plugins/playbooks/base_system.yml
//!     parameters:
//!       kernel_package: linux-image-amd64
//! ```
//!
//! Order is fixed by the layer that first names an item. Later layers may
//! replace the path and deep-merge parameters but never move the item.

use super::loader::ConfigSource;
use super::merge::deep_merge;
use super::types::ConfigError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One entry of a named ordered collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedItem {
    pub name: String,
    /// Path as written in the configuration (None if no layer supplied one)
    pub defining_path: Option<String>,
    /// Deep-merged `parameters` of every layer that mentions the item
    pub variables: Value,
    #[serde(skip)]
    pub skip: bool,
}

impl OrderedItem {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            defining_path: None,
            variables: Value::Object(Map::new()),
            skip: false,
        }
    }

    /// The defining path, or an error naming the section and item.
    pub fn require_path(&self, section: &str) -> Result<&str, ConfigError> {
        self.defining_path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField(format!("{}.{}.path", section, self.name)))
    }
}

fn invalid(field: String, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

/// Resolve `section` across `sources` (lowest precedence first).
///
/// A section that no layer defines resolves to an empty list. Items whose
/// merged `skip` flag is set are left out.
pub fn resolve_ordered_items(
    section: &str,
    sources: &[ConfigSource],
) -> Result<Vec<OrderedItem>, ConfigError> {
    let mut items: Vec<OrderedItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for source in sources {
        let entries = match source.document.get(section) {
            None | Some(Value::Null) => continue,
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                return Err(invalid(
                    section.to_string(),
                    &format!("expected a mapping of named items in {}", source.origin()),
                ));
            }
        };

        for (name, body) in entries {
            let slot = *index.entry(name.clone()).or_insert_with(|| {
                items.push(OrderedItem::new(name));
                items.len() - 1
            });
            let item = &mut items[slot];
            let field = |key: &str| format!("{}.{}.{}", section, name, key);

            let body = match body {
                Value::Null => continue,
                Value::Object(body) => body,
                _ => return Err(invalid(format!("{}.{}", section, name), "expected a mapping")),
            };

            match body.get("path") {
                None | Some(Value::Null) => {}
                Some(Value::String(path)) => item.defining_path = Some(path.clone()),
                Some(_) => return Err(invalid(field("path"), "expected a string")),
            }

            match body.get("parameters") {
                None | Some(Value::Null) => {}
                Some(params @ Value::Object(_)) => {
                    let current = std::mem::take(&mut item.variables);
                    item.variables = deep_merge(current, params.clone());
                }
                Some(_) => return Err(invalid(field("parameters"), "expected a mapping")),
            }

            match body.get("skip") {
                None | Some(Value::Null) => {}
                Some(Value::Bool(skip)) => item.skip = *skip,
                Some(_) => return Err(invalid(field("skip"), "expected a boolean")),
            }
        }
    }

    Ok(items.into_iter().filter(|item| !item.skip).collect())
}
