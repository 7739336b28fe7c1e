//! Wires a resolved [`Config`] into the concrete component stack the CLI
//! and the HTTP API share: gateway, gate registry, repair engine, compiler
//! registry, idempotency store. The CLI drives a [`Pipeline`] directly; the
//! API wraps the same pieces in `readerforge_api::AppState`.

use std::time::Duration;

use readerforge_compiler::{CompilerRegistry, StubCompiler};
use readerforge_gate::GateRegistry;
use readerforge_idempotency::IdempotencyStore;
use readerforge_llm::{HttpBackend, LlmGateway, StubBackend};
use readerforge_ratelimit::{KeyConfig, RateLimiter};
use readerforge_repair::RepairEngine;
use readerforge_retry::{PolicyTable, RetryExecutor};
use readerforge_types::AssetKind;

use crate::config::Config;

/// Every long-lived component the pipeline and the API need, built once
/// per process from a resolved [`Config`].
pub struct Runtime {
    pub gateway: LlmGateway,
    pub gates: GateRegistry,
    pub repair: RepairEngine,
    pub compilers: CompilerRegistry,
    pub idempotency: IdempotencyStore,
    pub rate_key_config: KeyConfig,
}

impl Runtime {
    pub fn build(config: &Config) -> anyhow::Result<Self> {
        let cache = readerforge_store::ContentStore::new(config.cache_dir.join("llm"), 512);
        let rate_limiter = RateLimiter::new(config.global_concurrency);
        let retry = RetryExecutor::new(PolicyTable::default());

        let backend: Box<dyn readerforge_llm::GenerationBackend> = match &config.llm_endpoint {
            Some(endpoint) => Box::new(HttpBackend::new(
                endpoint.clone(),
                config.llm_api_key.clone().unwrap_or_default(),
                Duration::from_secs(60),
            )?),
            None => Box::new(StubBackend::new()),
        };

        let gateway = LlmGateway::new(backend, cache, rate_limiter, KeyConfig::default(), retry)?;

        let mut compilers = CompilerRegistry::new();
        compilers.register(Box::new(StubCompiler::new(AssetKind::Plot)));
        compilers.register(Box::new(StubCompiler::new(AssetKind::Diagram)));
        compilers.register(Box::new(StubCompiler::new(AssetKind::Chem)));

        let idempotency = IdempotencyStore::new(
            config.cache_dir.join("idempotency"),
            config.idempotency_ttl_secs,
        );

        Ok(Self {
            gateway,
            gates: GateRegistry::with_defaults(),
            repair: RepairEngine::new(),
            compilers,
            idempotency,
            rate_key_config: KeyConfig::default(),
        })
    }
}
