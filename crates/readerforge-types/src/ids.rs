//! Newtype identifiers used throughout the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable per-request identifier threaded through every log line and
/// artifact produced while handling that request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier handed back to the caller from Submit, used for Status lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptId(pub String);

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 content hash, always rendered as `sha256:<64 hex digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Wrap a raw hex digest into the canonical `sha256:` form.
    ///
    /// # Panics
    /// Panics if `hex_digest` is not exactly 64 hex characters, since a
    /// malformed content hash is a programmer error, not recoverable input.
    #[must_use]
    pub fn from_hex(hex_digest: &str) -> Self {
        assert_eq!(hex_digest.len(), 64, "sha256 digest must be 64 hex chars");
        Self(format!("sha256:{hex_digest}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
