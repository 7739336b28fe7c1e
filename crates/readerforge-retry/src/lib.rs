//! Phase-keyed retry execution with jittered exponential backoff.

mod policy;
mod stats;

use std::fmt;

use rand::Rng;
use thiserror::Error;

pub use policy::{Phase, PolicyTable, RetryPolicy};
pub use stats::{PhaseCounters, RetryStats};

#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Display> {
    #[error("not retryable: {0}")]
    NotRetryable(E),

    #[error("retry budget exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Runs `operation` under `phase`'s policy, classifying each failure with
/// [`readerforge_ratelimit::is_retryable`] against its rendered message and
/// sleeping `policy.delay_for_attempt` between attempts.
pub struct RetryExecutor {
    policies: PolicyTable,
    stats: RetryStats,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self {
            policies: PolicyTable::default(),
            stats: RetryStats::default(),
        }
    }
}

impl RetryExecutor {
    #[must_use]
    pub fn new(policies: PolicyTable) -> Self {
        Self {
            policies,
            stats: RetryStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &RetryStats {
        &self.stats
    }

    pub fn execute<T, E: fmt::Display>(
        &self,
        phase: Phase,
        mut operation: impl FnMut() -> Result<T, E>,
    ) -> Result<T, RetryError<E>> {
        let policy = self.policies.get(phase);
        let mut attempt = 1;
        loop {
            self.stats.record_attempt(phase);
            match operation() {
                Ok(value) => {
                    self.stats.record_success(phase);
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = readerforge_ratelimit::is_retryable(&err.to_string());
                    if !retryable {
                        self.stats.record_failure(phase);
                        return Err(RetryError::NotRetryable(err));
                    }
                    if attempt >= policy.max_attempts {
                        self.stats.record_failure(phase);
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let jitter = rand::thread_rng().gen_range(0..=policy.jitter_ms.max(1));
                    let delay = policy.delay_for_attempt(attempt, jitter);
                    tracing::debug!(phase = phase.as_str(), attempt, ?delay, "retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn succeeds_after_transient_failures_within_budget() {
        let executor = RetryExecutor::default();
        let attempts = Cell::new(0);
        let result = executor.execute(Phase::LlmRequest, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 2 {
                Err("503 Service Unavailable".to_string())
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(executor.stats().for_phase(Phase::LlmRequest).successes, 1);
    }

    #[test]
    fn non_retryable_errors_terminate_immediately() {
        let executor = RetryExecutor::default();
        let attempts = Cell::new(0);
        let result = executor.execute(Phase::Validation, || {
            attempts.set(attempts.get() + 1);
            Err::<(), _>("invalid schema".to_string())
        });
        assert!(matches!(result, Err(RetryError::NotRetryable(_))));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn exhausts_the_attempt_budget_on_persistent_transient_failures() {
        let mut policies = PolicyTable::default();
        policies.set(
            Phase::Rendering,
            RetryPolicy {
                max_attempts: 2,
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(5),
                backoff_multiplier: 2.0,
                jitter_ms: 1,
            },
        );
        let executor = RetryExecutor::new(policies);
        let result = executor.execute(Phase::Rendering, || {
            Err::<(), _>("connection reset".to_string())
        });
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 2, .. })));
    }
}
