use std::time::Duration;

use readerforge_ratelimit::{KeyConfig, RateLimitError, RateLimiter};
use readerforge_retry::{Phase, RetryExecutor};
use readerforge_store::{CacheKey, ContentStore};
use serde_json::Value;

use crate::extraction::tolerant_extract;
use crate::types::{GenerationBackend, GenerationOptions, GenerationResponse};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("rate limiter rejected request: {0}")]
    RateLimit(String),

    #[error("retry budget exhausted calling the backend: {0}")]
    Retry(String),

    #[error("response could not be extracted for schema {schema}")]
    ExtractionFailed { schema: String },
}

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Wraps a [`GenerationBackend`] with content-hash cache lookup, per-key
/// rate limiting, and the `llm-request` retry policy.
pub struct LlmGateway {
    backend: Box<dyn GenerationBackend>,
    cache: ContentStore<Value>,
    rate_limiter: RateLimiter,
    rate_key_config: KeyConfig,
    retry: RetryExecutor,
    runtime: tokio::runtime::Runtime,
}

impl LlmGateway {
    pub fn new(
        backend: Box<dyn GenerationBackend>,
        cache: ContentStore<Value>,
        rate_limiter: RateLimiter,
        rate_key_config: KeyConfig,
        retry: RetryExecutor,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            backend,
            cache,
            rate_limiter,
            rate_key_config,
            retry,
            runtime,
        })
    }

    /// Generate a value conforming to `options.schema` for `prompt`,
    /// short-circuiting on a content-hash cache hit keyed on the full
    /// prompt, options, and attachment digest.
    pub fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Value, GatewayError> {
        let cache_key =
            CacheKey::from_content("llm", &(prompt, &options.schema, &options.attachment_id))
                .expect("prompt/options are always serializable");

        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let schema = options.schema.clone();

        let response: GenerationResponse = self
            .rate_limiter
            .execute(&schema, &self.rate_key_config, || {
                self.retry
                    .execute(Phase::LlmRequest, || {
                        self.runtime.block_on(self.backend.invoke(prompt, options))
                    })
                    .map_err(|err| err.to_string())
            })
            .map_err(|err| match err {
                RateLimitError::Operation(inner) => GatewayError::Retry(inner),
                other => GatewayError::RateLimit(other.to_string()),
            })?;

        let extracted = tolerant_extract(&schema, &response).ok_or(GatewayError::ExtractionFailed {
            schema: schema.clone(),
        })?;

        self.cache.set(&cache_key, extracted.clone(), CACHE_TTL);
        Ok(extracted)
    }

    /// Cache hit/miss/write tallies accumulated across every `generate`
    /// call this gateway has served, for run-level reporting.
    #[must_use]
    pub fn cache_stats(&self) -> readerforge_store::CacheStats {
        self.cache.stats()
    }

    /// Per-phase retry success/failure/attempt tallies; the gateway only
    /// drives [`Phase::LlmRequest`].
    #[must_use]
    pub fn retry_stats(&self) -> &readerforge_retry::RetryStats {
        self.retry.stats()
    }

    /// Total retry attempts (including first tries) the gateway has made
    /// calling the backend, for run-level reporting.
    #[must_use]
    pub fn retry_attempts(&self) -> u64 {
        self.retry.stats().total_attempts()
    }

    /// Total circuit-breaker trips across every rate-limit key this
    /// gateway has dispatched through.
    #[must_use]
    pub fn breaker_trips(&self) -> u64 {
        self.rate_limiter.total_breaker_trips()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use camino::Utf8PathBuf;
    use readerforge_types::CorrelationId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationBackend for CountingBackend {
        async fn invoke(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, crate::types::LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationResponse {
                structured: Some(serde_json::json!({"ok": true})),
                raw_text: String::new(),
            })
        }
    }

    fn gateway(backend: CountingBackend) -> (LlmGateway, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let cache = ContentStore::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            8,
        );
        let gw = LlmGateway::new(
            Box::new(backend),
            cache,
            RateLimiter::new(4),
            KeyConfig::default(),
            RetryExecutor::default(),
        )
        .unwrap();
        (gw, dir)
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            schema: "prose".to_string(),
            correlation_id: CorrelationId("corr-1".to_string()),
            attachment_id: None,
        }
    }

    #[test]
    fn second_identical_call_hits_the_cache_instead_of_the_backend() {
        let (gw, _dir) = gateway(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let opts = options();
        gw.generate("explain momentum", &opts).unwrap();
        gw.generate("explain momentum", &opts).unwrap();
        assert_eq!(gw.cache.stats().hits, 1);
    }

    #[test]
    fn rate_limit_rejection_surfaces_as_gateway_rate_limit_error() {
        let (gw, _dir) = gateway(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let opts = options();
        let tight = KeyConfig {
            burst_capacity: 1,
            ..KeyConfig::default()
        };
        let gw = LlmGateway {
            rate_key_config: tight,
            ..gw
        };
        gw.generate("first call consumes the only token", &opts)
            .unwrap();
        let second = gw.generate("a different prompt", &opts);
        assert!(matches!(second, Err(GatewayError::RateLimit(_))));
    }

    struct BlankBackend;

    #[async_trait]
    impl GenerationBackend for BlankBackend {
        async fn invoke(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, crate::types::LlmError> {
            Ok(GenerationResponse {
                structured: None,
                raw_text: String::new(),
            })
        }
    }

    #[test]
    fn blank_response_surfaces_as_extraction_failed() {
        let dir = tempdir().unwrap();
        let cache = ContentStore::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            8,
        );
        let gw = LlmGateway::new(
            Box::new(BlankBackend),
            cache,
            RateLimiter::new(4),
            KeyConfig::default(),
            RetryExecutor::default(),
        )
        .unwrap();
        let result = gw.generate("anything", &options());
        assert!(matches!(result, Err(GatewayError::ExtractionFailed { .. })));
    }
}
