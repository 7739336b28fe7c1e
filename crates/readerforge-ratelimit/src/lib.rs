//! Per-key rate limiting: token bucket, FIFO queue, circuit breaker, and a
//! global concurrency gate, composed behind a single `execute` call.

mod circuit_breaker;
mod error;
mod retryable;
mod semaphore;
mod token_bucket;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use circuit_breaker::{BreakerStatus, CircuitBreaker, CircuitBreakerConfig};
pub use error::RateLimitError;
pub use retryable::is_retryable;
pub use token_bucket::TokenBucket;

use semaphore::Semaphore;

#[derive(Clone)]
pub struct KeyConfig {
    pub burst_capacity: u32,
    pub requests_per_minute: u32,
    pub queue_capacity: usize,
    pub queue_timeout: Duration,
    pub breaker: CircuitBreakerConfig,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            burst_capacity: 10,
            requests_per_minute: 60,
            queue_capacity: 16,
            queue_timeout: Duration::from_secs(5),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

struct KeyState {
    bucket: Mutex<TokenBucket>,
    breaker: Mutex<CircuitBreaker>,
    queue_tx: crossbeam_channel::Sender<()>,
    queue_rx: crossbeam_channel::Receiver<()>,
    queue_capacity: usize,
}

impl KeyState {
    fn new(config: &KeyConfig) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(config.queue_capacity.max(1));
        for _ in 0..config.queue_capacity.max(1) {
            tx.send(()).expect("freshly created bounded channel has room");
        }
        Self {
            bucket: Mutex::new(TokenBucket::new(config.burst_capacity, config.requests_per_minute)),
            breaker: Mutex::new(CircuitBreaker::new(config.breaker.clone())),
            queue_tx: tx,
            queue_rx: rx,
            queue_capacity: config.queue_capacity.max(1),
        }
    }

    fn is_idle(&self) -> bool {
        self.queue_rx.len() == self.queue_capacity
    }
}

/// Per-key token buckets and circuit breakers, guarded by a global
/// concurrency gate shared across every key.
pub struct RateLimiter {
    keys: Mutex<HashMap<String, Arc<KeyState>>>,
    global: Semaphore,
}

impl RateLimiter {
    #[must_use]
    pub fn new(global_concurrency: usize) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            global: Semaphore::new(global_concurrency),
        }
    }

    fn get_or_create(&self, key: &str, config: &KeyConfig) -> Arc<KeyState> {
        let mut keys = self.keys.lock().unwrap();
        keys.entry(key.to_string())
            .or_insert_with(|| Arc::new(KeyState::new(config)))
            .clone()
    }

    /// Run `operation` under this key's rate limit, queue, and circuit
    /// breaker, then the global concurrency gate. Ordering mirrors the
    /// documented sequence: circuit check, token consumption, queue
    /// admission, dispatch.
    pub fn execute<T, E>(
        &self,
        key: &str,
        config: &KeyConfig,
        operation: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, RateLimitError<E>> {
        let state = self.get_or_create(key, config);

        if !state.breaker.lock().unwrap().permits_call() {
            return Err(RateLimitError::CircuitOpen {
                key: key.to_string(),
            });
        }

        if !state.bucket.lock().unwrap().try_consume() {
            return Err(RateLimitError::RateLimited {
                key: key.to_string(),
            });
        }

        if state.queue_rx.recv_timeout(config.queue_timeout).is_err() {
            return Err(RateLimitError::QueueTimeout {
                key: key.to_string(),
            });
        }

        let _permit = self.global.acquire();
        let result = operation();
        let _ = state.queue_tx.send(());

        let mut breaker = state.breaker.lock().unwrap();
        match &result {
            Ok(_) => breaker.record_success(),
            Err(_) => breaker.record_failure(),
        }
        drop(breaker);

        result.map_err(RateLimitError::Operation)
    }

    /// Drop key structures that are neither queued nor in token deficit.
    pub fn cleanup_idle(&self) {
        let mut keys = self.keys.lock().unwrap();
        keys.retain(|_, state| !state.is_idle() || Arc::strong_count(state) > 1);
    }

    #[must_use]
    pub fn breaker_status(&self, key: &str) -> Option<BreakerStatus> {
        let keys = self.keys.lock().unwrap();
        keys.get(key).map(|state| state.breaker.lock().unwrap().status())
    }

    /// Sum of every known key's breaker trip count, for run-level reporting.
    #[must_use]
    pub fn total_breaker_trips(&self) -> u64 {
        let keys = self.keys.lock().unwrap();
        keys.values().map(|state| state.breaker.lock().unwrap().trip_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_burst_capacity_is_exhausted() {
        let limiter = RateLimiter::new(4);
        let config = KeyConfig {
            burst_capacity: 1,
            requests_per_minute: 60,
            ..KeyConfig::default()
        };
        let first = limiter.execute("llm", &config, || Ok::<_, String>(1));
        assert!(first.is_ok());
        let second = limiter.execute("llm", &config, || Ok::<_, String>(1));
        assert!(matches!(second, Err(RateLimitError::RateLimited { .. })));
    }

    #[test]
    fn circuit_opens_after_repeated_failures_and_blocks_further_calls() {
        let limiter = RateLimiter::new(4);
        let config = KeyConfig {
            burst_capacity: 100,
            requests_per_minute: 6000,
            breaker: CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::from_secs(60),
                half_open_max_calls: 1,
            },
            ..KeyConfig::default()
        };
        for _ in 0..2 {
            let _ = limiter.execute("llm", &config, || Err::<i32, _>("boom".to_string()));
        }
        let blocked = limiter.execute("llm", &config, || Ok::<_, String>(1));
        assert!(matches!(blocked, Err(RateLimitError::CircuitOpen { .. })));
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = RateLimiter::new(4);
        let config = KeyConfig {
            burst_capacity: 1,
            ..KeyConfig::default()
        };
        assert!(limiter.execute("a", &config, || Ok::<_, String>(1)).is_ok());
        assert!(limiter.execute("b", &config, || Ok::<_, String>(1)).is_ok());
    }
}
