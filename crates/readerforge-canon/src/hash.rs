use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use readerforge_types::ContentHash;

/// Serialize `value` to JSON, NFC-normalize every string leaf, then
/// re-emit it as JCS-canonical bytes (RFC 8785): object keys sorted, no
/// insignificant whitespace, numbers in their shortest round-tripping
/// form. Normalizing before canonicalizing is what lets two producers
/// that handed in NFC-equivalent but differently-encoded text agree on
/// the resulting hash.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut json_value = serde_json::to_value(value).context("failed to serialize value to JSON")?;
    normalize_strings(&mut json_value);
    serde_json_canonicalizer::to_vec(&json_value).context("failed to canonicalize JSON via JCS")
}

/// Walk a JSON value, replacing every string leaf (including object
/// keys are left alone; JCS sorts those independently) with its
/// `normalize_text` form.
fn normalize_strings(value: &mut Value) {
    match value {
        Value::String(s) => *s = crate::text::normalize_text(s),
        Value::Array(items) => items.iter_mut().for_each(normalize_strings),
        Value::Object(map) => map.values_mut().for_each(normalize_strings),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// SHA-256 of arbitrary bytes, rendered as `sha256:<64 hex>`.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    ContentHash::from_hex(&hex_encode(&digest))
}

/// Canonicalize `value` via JCS, then hash the result with SHA-256. This is
/// the content-hash contract every pipeline stage uses for its `Envelope`.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<ContentHash> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("writing to a String cannot fail");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Ordered {
        b: i32,
        a: i32,
    }

    #[test]
    fn field_order_does_not_affect_hash() {
        let h1 = hash_canonical_json(&json!({"b": 1, "a": 2})).unwrap();
        let h2 = hash_canonical_json(&json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn struct_field_declaration_order_does_not_affect_hash() {
        let h1 = hash_canonical_json(&Ordered { b: 1, a: 2 }).unwrap();
        let h2 = hash_canonical_json(&json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_is_rendered_with_sha256_prefix() {
        let hash = hash_bytes(b"hello");
        assert!(hash.as_str().starts_with("sha256:"));
        assert_eq!(hash.as_str().len(), "sha256:".len() + 64);
    }

    #[test]
    fn hash_is_deterministic() {
        let h1 = hash_bytes(b"same input");
        let h2 = hash_bytes(b"same input");
        assert_eq!(h1, h2);
    }
}
