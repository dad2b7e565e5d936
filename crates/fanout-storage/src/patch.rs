//! JSON Merge Patch (RFC 7396) creation and application.

use json_patch::merge;
use serde_json::{Map, Value};

use crate::error::StorageError;

/// Computes the merge patch that turns `before` into `after`.
///
/// Objects are diffed key by key, removed keys become `null`, and every other
/// value (arrays included) is replaced wholesale. Identical documents yield `{}`.
pub fn create_merge_patch(before: &Value, after: &Value) -> Value {
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => Value::Object(diff_objects(before, after)),
        _ => after.clone(),
    }
}

fn diff_objects(before: &Map<String, Value>, after: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();

    for key in before.keys() {
        if !after.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    for (key, new_value) in after {
        match before.get(key) {
            Some(old_value) if old_value == new_value => {}
            Some(Value::Object(old)) if new_value.is_object() => {
                if let Value::Object(new) = new_value {
                    let nested = diff_objects(old, new);
                    if !nested.is_empty() {
                        patch.insert(key.clone(), Value::Object(nested));
                    }
                }
            }
            _ => {
                patch.insert(key.clone(), new_value.clone());
            }
        }
    }

    patch
}

/// `true` for a patch that changes nothing (`{}`).
pub fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().is_some_and(Map::is_empty)
}

/// Applies raw merge patch bytes to `target`.
///
/// # Errors
///
/// Returns `StorageError::InvalidPatch` if the bytes are not a JSON object.
pub fn apply_merge_patch(target: &mut Value, patch_bytes: &[u8]) -> Result<(), StorageError> {
    let patch: Value = serde_json::from_slice(patch_bytes)
        .map_err(|e| StorageError::invalid_patch(format!("Invalid merge patch document: {e}")))?;
    if !patch.is_object() {
        return Err(StorageError::invalid_patch(
            "merge patch must be a JSON object",
        ));
    }
    merge(target, &patch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_documents_yield_empty_patch() {
        let doc = json!({"spec": {"subscribers": [{"uid": "a"}]}});
        let patch = create_merge_patch(&doc, &doc);
        assert!(is_empty_patch(&patch));
        assert_eq!(serde_json::to_vec(&patch).unwrap(), b"{}");
    }

    #[test]
    fn test_nested_change_only_names_changed_path() {
        let before = json!({
            "metadata": {"name": "orders", "resourceVersion": "3"},
            "spec": {"delivery": {"retry": 1}, "subscribers": []}
        });
        let after = json!({
            "metadata": {"name": "orders", "resourceVersion": "3"},
            "spec": {"delivery": {"retry": 1}, "subscribers": [{"uid": "a"}]}
        });
        assert_eq!(
            create_merge_patch(&before, &after),
            json!({"spec": {"subscribers": [{"uid": "a"}]}})
        );
    }

    #[test]
    fn test_removed_key_becomes_null() {
        let before = json!({"spec": {"subscribers": [{"uid": "a"}], "delivery": {"retry": 1}}});
        let after = json!({"spec": {"delivery": {"retry": 1}}});
        assert_eq!(
            create_merge_patch(&before, &after),
            json!({"spec": {"subscribers": null}})
        );
    }

    #[test]
    fn test_patch_applies_back_to_after() {
        let before = json!({
            "spec": {"subscribers": [{"uid": "a", "generation": 1}], "delivery": {"retry": 2}},
            "status": {"ready": true}
        });
        let after = json!({
            "spec": {"subscribers": [{"uid": "a", "generation": 2}]},
            "status": {"ready": true}
        });
        let patch = create_merge_patch(&before, &after);
        let bytes = serde_json::to_vec(&patch).unwrap();

        let mut target = before.clone();
        apply_merge_patch(&mut target, &bytes).unwrap();
        assert_eq!(target, after);
    }

    #[test]
    fn test_apply_rejects_non_object_patch() {
        let mut target = json!({});
        let err = apply_merge_patch(&mut target, b"[1,2]").unwrap_err();
        assert!(matches!(err, StorageError::InvalidPatch { .. }));
        assert!(apply_merge_patch(&mut target, b"not json").is_err());
    }
}
