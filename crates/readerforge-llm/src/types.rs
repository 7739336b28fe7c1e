use async_trait::async_trait;
use readerforge_types::CorrelationId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub schema: String,
    pub correlation_id: CorrelationId,
    pub attachment_id: Option<String>,
}

/// What the remote actually returned: a declared-schema object when the
/// provider cooperates, always alongside the raw text for tolerant
/// extraction to fall back on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub structured: Option<serde_json::Value>,
    pub raw_text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A single LLM provider. Implementations talk to whatever transport they
/// like (HTTP, local process); the gateway is transport-agnostic.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn invoke(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LlmError>;
}
