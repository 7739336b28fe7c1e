//! The versioned wrapper around every inter-stage artifact (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContentHash, CorrelationId};

/// Identifies which stage produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Producer {
    Plan,
    Scaffold,
    Section,
    Assemble,
}

impl Producer {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Scaffold => "scaffold",
            Self::Section => "section",
            Self::Assemble => "assemble",
        }
    }
}

/// Wraps every inter-stage artifact with provenance, compatibility, and
/// content-addressing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Semantic version string, e.g. `"1.0.0"`.
    pub version: String,
    pub producer: Producer,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: CorrelationId,
    pub content_hash: ContentHash,
    /// Ordered list of versions the consumer may accept.
    pub compatible_versions: Vec<String>,
    /// Deterministic hash covering template, variables, model parameters,
    /// and attachments, present once the producing stage has one.
    pub idempotency_key: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn new(
        producer: Producer,
        correlation_id: CorrelationId,
        content_hash: ContentHash,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            version: "1.0.0".to_string(),
            producer,
            timestamp: now,
            correlation_id,
            content_hash,
            compatible_versions: crate::compat::compatible_versions_for(producer),
            idempotency_key: None,
        }
    }

    /// Returns whether a consumer declaring `accepted_versions` may consume
    /// this envelope, per the version-incompatibility rule in spec.md §7.
    #[must_use]
    pub fn is_compatible_with(&self, accepted_versions: &[String]) -> bool {
        accepted_versions.iter().any(|v| v == &self.version)
    }
}
