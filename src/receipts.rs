//! Structured run receipts: one JSON file per completed (or failed) pipeline
//! run, written to `<outputDir>/receipts/<promptId>.json` via the same
//! atomic-publish path used for the generated document itself. Purely
//! observability — nothing here feeds back into pipeline behavior.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct StageDuration {
    pub stage: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReceipt {
    pub schema_version: u32,
    pub prompt_id: String,
    pub correlation_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub final_state: String,
    pub error: Option<String>,
    pub stage_durations: Vec<StageDuration>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retry_attempts: u64,
    pub circuit_breaker_trips: u64,
    pub gates_passed: u64,
    pub gates_failed: u64,
}

impl RunReceipt {
    /// Atomically publish this receipt under `output_dir/receipts/<prompt_id>.json`.
    pub fn publish(&self, output_dir: &Utf8Path) -> Result<readerforge_publish::PublishResult, readerforge_publish::PublishError> {
        let path = output_dir.join("receipts").join(format!("{}.json", self.prompt_id));
        let bytes = serde_json::to_vec_pretty(self).expect("RunReceipt always serializes");
        readerforge_publish::publish(&path, &bytes, &self.prompt_id, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_to_the_receipts_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let now = Utc::now();

        let receipt = RunReceipt {
            schema_version: SCHEMA_VERSION,
            prompt_id: "abc123".to_string(),
            correlation_id: "corr-1".to_string(),
            started_at: now,
            finished_at: now,
            succeeded: true,
            final_state: "completed".to_string(),
            error: None,
            stage_durations: vec![StageDuration { stage: "plan".to_string(), duration_ms: 12 }],
            cache_hits: 1,
            cache_misses: 0,
            retry_attempts: 0,
            circuit_breaker_trips: 0,
            gates_passed: 5,
            gates_failed: 0,
        };

        let result = receipt.publish(&output_dir).unwrap();
        assert!(result.file_path.as_str().ends_with("receipts/abc123.json"));
        assert!(result.file_path.exists());
    }
}
