//! Helpers for the untyped JSON blobs (extracted data, manual data)
//!
//! Paths are dot-delimited (`land_registry.gush`). A segment is looked up as
//! an object key, or as an index when the current value is an array.
//! Absence is semantic: a missing key, `null` and `""` all mean "not extracted".

use serde_json::{Map, Value};

/// A top-level JSON object as persisted in session storage
pub type Blob = Map<String, Value>;

/// Whether a resolved value counts as present
///
/// `0`, `false`, empty arrays and empty objects are present.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Traverse a dotted path starting from any JSON value
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Traverse a dotted path starting from a top-level blob
pub fn get_in<'a>(blob: &'a Blob, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let first = blob.get(head)?;
    match rest {
        Some(rest) => get_path(first, rest),
        None => Some(first),
    }
}

/// Like [`get_in`] but only returns present values
pub fn get_present<'a>(blob: &'a Blob, path: &str) -> Option<&'a Value> {
    get_in(blob, path).filter(|v| is_present(v))
}

/// Write a value at a dotted path, creating intermediate objects
///
/// Intermediate values that are not objects are replaced. Returns the
/// previous value at the path, if any.
pub fn set_in(blob: &mut Blob, path: &str, value: Value) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments.split_last()?;

    let mut current = blob;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut()?;
    }
    current.insert(last.to_string(), value)
}

/// Shallow-assign every top-level key of `overlay` onto `base`
pub fn shallow_merge(base: &mut Blob, overlay: &Blob) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}

/// Top-level keys whose value differs between two blobs
///
/// Returns `(key, before, after)` triples in `after` key order, followed by
/// keys only present in `before`.
pub fn changed_keys(before: &Blob, after: &Blob) -> Vec<(String, Option<Value>, Option<Value>)> {
    let mut changes = Vec::new();
    for (key, new_value) in after {
        match before.get(key) {
            Some(old_value) if old_value == new_value => {}
            old => changes.push((key.clone(), old.cloned(), Some(new_value.clone()))),
        }
    }
    for (key, old_value) in before {
        if !after.contains_key(key) {
            changes.push((key.clone(), Some(old_value.clone()), None));
        }
    }
    changes
}

/// Convert a JSON value into a blob, treating non-objects as empty
pub fn into_blob(value: Value) -> Blob {
    match value {
        Value::Object(map) => map,
        _ => Blob::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob(value: Value) -> Blob {
        into_blob(value)
    }

    #[test]
    fn test_get_in_nested() {
        let b = blob(json!({"land_registry": {"gush": 123, "owners": [{"name": "A"}]}}));
        assert_eq!(get_in(&b, "land_registry.gush"), Some(&json!(123)));
        assert_eq!(get_in(&b, "land_registry.owners.0.name"), Some(&json!("A")));
        assert_eq!(get_in(&b, "land_registry.chelka"), None);
    }

    #[test]
    fn test_get_in_stops_at_scalar() {
        let b = blob(json!({"gush": 123}));
        assert_eq!(get_in(&b, "gush.value"), None);
    }

    #[test]
    fn test_is_present_falsy_values() {
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(false)));
        assert!(is_present(&json!([])));
        assert!(is_present(&json!("0")));
        assert!(!is_present(&json!(null)));
        assert!(!is_present(&json!("")));
    }

    #[test]
    fn test_set_in_creates_parents() {
        let mut b = Blob::new();
        let old = set_in(&mut b, "building_permit.permit_number", json!("X"));
        assert!(old.is_none());
        assert_eq!(get_in(&b, "building_permit.permit_number"), Some(&json!("X")));

        let old = set_in(&mut b, "building_permit.permit_number", json!("Y"));
        assert_eq!(old, Some(json!("X")));
    }

    #[test]
    fn test_set_in_replaces_scalar_parent() {
        let mut b = blob(json!({"shared_building": "n/a"}));
        set_in(&mut b, "shared_building.order_date", json!("2020-01-01"));
        assert_eq!(
            get_in(&b, "shared_building.order_date"),
            Some(&json!("2020-01-01"))
        );
    }

    #[test]
    fn test_shallow_merge_overlay_wins() {
        let mut base = blob(json!({"a": 1, "ns": {"x": 1, "y": 2}}));
        let overlay = blob(json!({"ns": {"x": 9}, "b": 2}));
        shallow_merge(&mut base, &overlay);
        assert_eq!(Value::Object(base), json!({"a": 1, "ns": {"x": 9}, "b": 2}));
    }

    #[test]
    fn test_changed_keys() {
        let before = blob(json!({"a": 1, "b": 2, "gone": true}));
        let after = blob(json!({"a": 1, "b": 3, "c": 4}));
        let changes = changed_keys(&before, &after);
        let keys: Vec<_> = changes.iter().map(|(k, _, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "gone"]);
    }
}
