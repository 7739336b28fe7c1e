use readerforge_canon::hash_canonical_json;
use readerforge_types::ContentHash;
use serde::Serialize;

#[derive(Serialize)]
struct KeyMaterial<'a, R: Serialize> {
    operation: &'a str,
    request: &'a R,
    attachments: &'a [ContentHash],
}

/// Deterministic fingerprint over `{operation, request, attachments}`,
/// canonicalized and SHA-256-hashed, matching the content-hash contract
/// used throughout the pipeline's envelopes.
pub fn generate_key<R: Serialize>(
    operation: &str,
    request: &R,
    attachments: &[ContentHash],
) -> anyhow::Result<ContentHash> {
    hash_canonical_json(&KeyMaterial {
        operation,
        request,
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_inputs_produce_the_same_key() {
        let a = generate_key("submit", &json!({"subject": "physics"}), &[]).unwrap();
        let b = generate_key("submit", &json!({"subject": "physics"}), &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_operations_produce_different_keys() {
        let a = generate_key("submit", &json!({"subject": "physics"}), &[]).unwrap();
        let b = generate_key("status", &json!({"subject": "physics"}), &[]).unwrap();
        assert_ne!(a, b);
    }
}
