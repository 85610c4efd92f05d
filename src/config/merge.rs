//! Deep merge of JSON-shaped configuration trees

use serde_json::Value;

/// Overlay `source` onto `target` in place.
///
/// Objects are merged key by key, recursing into nested objects. Everything
/// else (strings, numbers, booleans, arrays, `null`) is a leaf and overwrites
/// the target slot. A `null` source leaves `target` untouched; a `null`
/// target becomes a copy of `source`.
pub fn deep_merge(target: &mut Value, source: &Value) {
    if source.is_null() {
        return;
    }
    if target.is_null() {
        *target = source.clone();
        return;
    }

    let Value::Object(source_map) = source else {
        if !target.is_object() {
            *target = source.clone();
        }
        return;
    };
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, source_value) in source_map {
        if source_value.is_object() {
            let slot = target_map.entry(key.clone()).or_insert(Value::Null);
            if !slot.is_object() {
                *slot = Value::Object(serde_json::Map::new());
            }
            deep_merge(slot, source_value);
        } else {
            target_map.insert(key.clone(), source_value.clone());
        }
    }
}

/// Owned form of [`deep_merge`]: consumes `target` and returns the merged tree.
pub fn merged(mut target: Value, source: &Value) -> Value {
    deep_merge(&mut target, source);
    target
}
