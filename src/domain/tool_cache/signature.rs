//! Call signature canonicalization and entry identifiers

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize tool arguments to a canonical string. Object keys are
/// emitted in sorted order so that argument ordering never changes the
/// signature.
pub fn canonical_signature(args: &Value) -> String {
    canonical_value(args).to_string()
}

fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = serde_json::Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonical_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

/// Generate a deterministic entry id from tool name and canonical
/// signature. SHA-256, truncated to 16 hex characters for readability.
pub fn entry_id(tool_name: &str, signature: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", tool_name, signature).as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature_sorts_keys() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});

        assert_eq!(canonical_signature(&a), canonical_signature(&b));
        assert_eq!(canonical_signature(&a), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_signature_sorts_nested_keys() {
        let a = json!({"outer": {"y": 2, "x": 1}});
        let b = json!({"outer": {"x": 1, "y": 2}});

        assert_eq!(canonical_signature(&a), canonical_signature(&b));
    }

    #[test]
    fn test_entry_id_deterministic() {
        let sig = r#"{"query":"rust"}"#;

        assert_eq!(entry_id("search", sig), entry_id("search", sig));
        assert_eq!(entry_id("search", sig).len(), 16);
    }

    #[test]
    fn test_entry_id_scoped_by_tool() {
        let sig = r#"{"query":"rust"}"#;

        assert_ne!(entry_id("search", sig), entry_id("fetch", sig));
    }
}
