//! Cache keys: `<key_type>:sha256(canonicalize(content))`.

use readerforge_canon::hash_canonical_json;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key directly from an already-unique string, bypassing
    /// hashing. Useful for keys that are themselves content hashes, such
    /// as a fingerprint computed upstream.
    #[must_use]
    pub fn new(key_type: &str, raw: &str) -> Self {
        Self(format!("{key_type}:{raw}"))
    }

    /// Build a key by canonicalizing and hashing `content`, matching the
    /// `keyType:SHA256(canonicalize(content))` scheme.
    pub fn from_content<T: Serialize>(key_type: &str, content: &T) -> anyhow::Result<Self> {
        let hash = hash_canonical_json(content)?;
        Ok(Self(format!("{key_type}:{}", hash.as_str())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two hex characters of the hash portion of the key (after the
    /// `key_type:` prefix and any `sha256:` scheme prefix), used for disk
    /// fan-out. Falls back to `"00"` for keys too short to slice.
    #[must_use]
    pub fn fanout_prefix(&self) -> &str {
        let hash_part = self.0.rsplit(':').next().unwrap_or(&self.0);
        hash_part.get(0..2).unwrap_or("00")
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_produces_the_same_key() {
        let a = CacheKey::from_content("plan", &"hello world").unwrap();
        let b = CacheKey::from_content("plan", &"hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_key_types_produce_different_keys() {
        let a = CacheKey::from_content("plan", &"same").unwrap();
        let b = CacheKey::from_content("scaffold", &"same").unwrap();
        assert_ne!(a, b);
    }
}
