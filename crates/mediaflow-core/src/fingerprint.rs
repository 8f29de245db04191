//! Canonicalización JSON y huella de contenido.
//! Misma forma que el hashing del engine original (canonicalizar, luego
//! hashear) pero sobre SHA-256 en vez de BLAKE3, para no sumar una dependencia
//! nueva al workspace.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree
                .into_iter()
                .map(|(k, v)| format!("{}:{}", serde_json::to_string(&k).unwrap(), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

pub fn hash_bytes(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

pub fn hash_value(v: &Value) -> String {
    let canonical = to_canonical_json(v);
    hash_bytes(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_orders_object_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(to_canonical_json(&a), to_canonical_json(&b));
    }

    #[test]
    fn hash_value_is_stable_across_key_order() {
        let a = json!({"filename": "a.jpg", "size": 10});
        let b = json!({"size": 10, "filename": "a.jpg"});
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn hash_value_differs_on_content() {
        let a = json!({"bytes": "abc"});
        let b = json!({"bytes": "abd"});
        assert_ne!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn identical_bytes_yield_identical_fingerprint() {
        // Dos archivos con contenido idéntico deben producir la misma huella,
        // independientemente del nombre de archivo (escenario C del spec).
        let content = b"same-bytes-regardless-of-filename";
        assert_eq!(hash_bytes(content), hash_bytes(content));
    }
}
