//! Shared process state the handlers close over: the long-lived gateway,
//! gate/repair/compiler registries, the idempotency store, and the
//! in-memory job table the Status endpoint reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use readerforge_compiler::CompilerRegistry;
use readerforge_gate::GateRegistry;
use readerforge_idempotency::IdempotencyStore;
use readerforge_llm::LlmGateway;
use readerforge_repair::RepairEngine;
use serde::Serialize;
use serde_json::Value;

/// Coarse job status mirroring spec.md §6's Status response `status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub prompt_id: String,
    pub status: JobStatus,
    pub stage: String,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub artifacts: Option<Value>,
}

impl JobRecord {
    #[must_use]
    pub fn accepted(prompt_id: String) -> Self {
        let now = Utc::now();
        Self {
            prompt_id,
            status: JobStatus::Queued,
            stage: "accepted".to_string(),
            progress: 0,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
            artifacts: None,
        }
    }
}

/// Tuning knobs the API layer itself owns, distinct from the pipeline's own
/// `PipelineConfig` (section worker width), which every run also needs.
pub struct ApiConfig {
    pub section_concurrency: usize,
    pub lock_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub idempotency_ttl_secs: u64,
    pub lock_ttl_secs: u64,
}

/// Everything an axum handler needs, cloned cheaply per request via `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<LlmGateway>,
    pub gates: Arc<GateRegistry>,
    pub repair: Arc<RepairEngine>,
    pub compilers: Arc<CompilerRegistry>,
    pub idempotency: Arc<IdempotencyStore>,
    pub jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(
        gateway: LlmGateway,
        gates: GateRegistry,
        repair: RepairEngine,
        compilers: CompilerRegistry,
        idempotency: IdempotencyStore,
        config: ApiConfig,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            gates: Arc::new(gates),
            repair: Arc::new(repair),
            compilers: Arc::new(compilers),
            idempotency: Arc::new(idempotency),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }
}
