//! Deep merge functionality for layered YAML configurations.
//!
//! Implements field-by-field merging where higher tier values override lower tier values.
//! Lists are replaced entirely, not concatenated. Mapping order is the order in which
//! keys were first introduced, so merged documents dump in a stable order.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Lists, strings, numbers, booleans and nulls are replaced entirely
/// - A mapping meeting a non-mapping at the same path is replaced by the overlay value
///
/// # Example
/// ```
/// use serde_json::json;
/// use strata::config::deep_merge;
///
/// let base = json!({
///     "bootstrap": { "architecture": "amd64", "tool": "debootstrap" },
///     "packages": ["a", "b"]
/// });
/// let overlay = json!({
///     "bootstrap": { "architecture": "i386" },
///     "packages": ["c"]
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result["bootstrap"]["architecture"], "i386");
/// assert_eq!(result["bootstrap"]["tool"], "debootstrap");
/// assert_eq!(result["packages"], json!(["c"]));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                // Merge in place so the key keeps its first-introduction position.
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding `deep_merge` over the list. An empty list yields an
/// empty mapping rather than null.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Default::default()), deep_merge)
}
