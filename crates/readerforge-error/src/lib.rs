//! Aggregated error taxonomy for readerforge.
//!
//! Each crate defines its own focused `thiserror` error type and stays free
//! of any dependency on this crate, so that lower-level crates never need
//! to know about the aggregate. Call sites at the orchestrator/CLI/HTTP
//! boundary wrap a domain error into a `ReaderforgeError` variant (carrying
//! its `Display` text), which is the only place exit codes or HTTP status
//! codes are decided.

use thiserror::Error;

pub mod exit_code;

pub use exit_code::ExitCode;

/// The aggregate error type returned at pipeline and CLI/HTTP boundaries.
#[derive(Debug, Error)]
pub enum ReaderforgeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("canonicalization failed in {stage}: {reason}")]
    Canonicalization { stage: String, reason: String },

    #[error("cache store error: {0}")]
    Store(String),

    #[error("rate limiter error: {0}")]
    RateLimit(String),

    #[error("retry budget exhausted after {attempts} attempts: {reason}")]
    RetryExhausted { attempts: u32, reason: String },

    #[error("lock error: {0}")]
    Lock(String),

    #[error("idempotency store error: {0}")]
    Idempotency(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("LLM gateway error: {0}")]
    Llm(String),

    #[error("gate {gate_id} failed: {reason}")]
    GateFailed { gate_id: String, reason: String },

    #[error("repair engine gave up on {module} after {attempts} attempts: {reason}")]
    RepairExhausted {
        module: String,
        attempts: u32,
        reason: String,
    },

    #[error("pipeline stage {stage} failed: {reason}")]
    Stage { stage: String, reason: String },

    #[error("asset compiler error: {0}")]
    Compiler(String),

    #[error("request API error: {0}")]
    Api(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Coarse category used for structured logging and for picking an exit
/// code / HTTP status without matching on every `ReaderforgeError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CliArgs,
    ResourceLimit,
    SecretOrValidation,
    LockHeld,
    Timeout,
    BackendFailure,
    Unknown,
}

impl ReaderforgeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidTransition { .. } => ErrorKind::CliArgs,
            Self::Lock(_) => ErrorKind::LockHeld,
            Self::RetryExhausted { .. } => ErrorKind::Timeout,
            Self::Llm(_) | Self::Compiler(_) | Self::Api(_) => ErrorKind::BackendFailure,
            Self::GateFailed { .. } => ErrorKind::SecretOrValidation,
            Self::Io(_)
            | Self::Canonicalization { .. }
            | Self::Store(_)
            | Self::RateLimit(_)
            | Self::Idempotency(_)
            | Self::Publish(_)
            | Self::RepairExhausted { .. }
            | Self::Stage { .. } => ErrorKind::Unknown,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        exit_code::for_kind(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_cli_args_exit_code() {
        let err = ReaderforgeError::Config("missing field".to_string());
        assert_eq!(err.exit_code(), ExitCode::CliArgs);
    }

    #[test]
    fn lock_errors_map_to_lock_held_exit_code() {
        let err = ReaderforgeError::Lock("already held".to_string());
        assert_eq!(err.exit_code(), ExitCode::LockHeld);
    }
}
