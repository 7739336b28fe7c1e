use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use readerforge_types::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Registered,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub correlation_id: CorrelationId,
    pub metadata: BTreeMap<String, String>,
    pub state: RecordState,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ttl_secs: u64,
}

impl IdempotencyRecord {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let reference = self.completed_at.unwrap_or(self.registered_at);
        (now - reference).num_seconds() > self.ttl_secs as i64
    }
}
