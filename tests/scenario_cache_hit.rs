//! Seed scenario: a second call with the same prompt, schema, and
//! attachment id must short-circuit on the content-hash cache rather than
//! reaching the backend again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use readerforge_llm::{GenerationBackend, GenerationOptions, GenerationResponse, LlmError, LlmGateway};
use readerforge_ratelimit::{KeyConfig, RateLimiter};
use readerforge_retry::{PolicyTable, RetryExecutor};
use readerforge_types::CorrelationId;

struct CountingBackend {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl GenerationBackend for CountingBackend {
    async fn invoke(&self, _prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerationResponse {
            structured: Some(serde_json::json!({ "markdown": "cached prose" })),
            raw_text: "cached prose".to_string(),
        })
    }
}

#[test]
fn repeated_identical_requests_hit_the_cache_instead_of_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = camino::Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap();
    let cache = readerforge_store::ContentStore::new(cache_dir, 64);

    let calls = Arc::new(AtomicUsize::new(0));
    let backend = Box::new(CountingBackend { calls: calls.clone() });

    let gw = LlmGateway::new(
        backend,
        cache,
        RateLimiter::new(8),
        KeyConfig::default(),
        RetryExecutor::new(PolicyTable::default()),
    )
    .unwrap();

    let options = GenerationOptions {
        schema: "section-prose".to_string(),
        correlation_id: CorrelationId("corr-cache".to_string()),
        attachment_id: Some("demo".to_string()),
    };

    let first = gw.generate("same prompt", &options).unwrap();
    let second = gw.generate("same prompt", &options).unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second call should be served from cache");
}
