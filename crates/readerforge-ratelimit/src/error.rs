use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError<E> {
    #[error("circuit open for key {key}")]
    CircuitOpen { key: String },

    #[error("rate limited for key {key}")]
    RateLimited { key: String },

    #[error("queue full or timed out for key {key}")]
    QueueTimeout { key: String },

    #[error(transparent)]
    Operation(#[from] E),
}
