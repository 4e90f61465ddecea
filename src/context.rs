//! Invocation-context handling.
//!
//! Publishers and subscribers can each attach a context object to deliveries.
//! When both are present the delivery engine merges them field by field,
//! with subscriber fields taking precedence; when neither is present the
//! callback runs with no context at all.

use serde_json::Value;

/// Whether a value can serve as a context or data payload.
///
/// Only JSON objects qualify; scalars and arrays are normalized away.
pub fn is_object_like(value: &Value) -> bool {
    value.is_object()
}

/// Normalize an optional payload, keeping it only when object-like.
pub fn normalize(value: Option<Value>) -> Option<Value> {
    value.filter(is_object_like)
}

/// Merge the subscriber context over the publisher context.
///
/// Field-by-field shallow merge: subscriber fields win on conflict. With
/// only one side present, that side is used as-is.
pub fn merge(publisher: Option<&Value>, subscriber: Option<&Value>) -> Option<Value> {
    match (publisher, subscriber) {
        (None, None) => None,
        (Some(p), None) => Some(p.clone()),
        (None, Some(s)) => Some(s.clone()),
        (Some(p), Some(s)) => {
            let mut merged = p.as_object().cloned().unwrap_or_default();
            if let Some(fields) = s.as_object() {
                for (key, value) in fields {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Value::Object(merged))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_like() {
        assert!(is_object_like(&json!({})));
        assert!(is_object_like(&json!({"a": 1})));
        assert!(!is_object_like(&json!([1, 2])));
        assert!(!is_object_like(&json!("string")));
        assert!(!is_object_like(&json!(42)));
        assert!(!is_object_like(&Value::Null));
    }

    #[test]
    fn test_normalize_drops_non_objects() {
        assert_eq!(normalize(Some(json!({"k": "v"}))), Some(json!({"k": "v"})));
        assert_eq!(normalize(Some(json!("nope"))), None);
        assert_eq!(normalize(Some(json!([1]))), None);
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn test_merge_subscriber_wins() {
        let publisher = json!({"who": "publisher", "shared": 1});
        let subscriber = json!({"who": "subscriber"});
        let merged = merge(Some(&publisher), Some(&subscriber)).unwrap();
        assert_eq!(merged, json!({"who": "subscriber", "shared": 1}));
    }

    #[test]
    fn test_merge_single_side() {
        let ctx = json!({"a": 1});
        assert_eq!(merge(Some(&ctx), None), Some(ctx.clone()));
        assert_eq!(merge(None, Some(&ctx)), Some(ctx));
        assert_eq!(merge(None, None), None);
    }
}
