use std::time::Duration;

/// The fixed phase keys retry policies are scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    LlmRequest,
    ContentGeneration,
    AssetCompilation,
    FileOperations,
    Validation,
    Rendering,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LlmRequest => "llm-request",
            Self::ContentGeneration => "content-generation",
            Self::AssetCompilation => "asset-compilation",
            Self::FileOperations => "file-operations",
            Self::Validation => "validation",
            Self::Rendering => "rendering",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// Delay before the attempt numbered `attempt` (1-indexed), per
    /// `min(initialDelay * multiplier^(attempt-1) + uniform(0, jitterMs), maxDelay)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32, jitter: u64) -> Duration {
        let scaled = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt.saturating_sub(1)) as i32);
        let with_jitter = scaled + jitter as f64;
        let capped = with_jitter.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

/// Default per-phase policies; callers may override via `PolicyTable::set`.
pub struct PolicyTable {
    policies: std::collections::HashMap<Phase, RetryPolicy>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        let default_policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_ms: 100,
        };
        let mut policies = std::collections::HashMap::new();
        for phase in [
            Phase::LlmRequest,
            Phase::ContentGeneration,
            Phase::AssetCompilation,
            Phase::FileOperations,
            Phase::Validation,
            Phase::Rendering,
        ] {
            policies.insert(phase, default_policy.clone());
        }
        Self { policies }
    }
}

impl PolicyTable {
    #[must_use]
    pub fn get(&self, phase: Phase) -> &RetryPolicy {
        self.policies
            .get(&phase)
            .expect("every Phase has a default entry")
    }

    pub fn set(&mut self, phase: Phase, policy: RetryPolicy) {
        self.policies.insert(phase, policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(900),
            backoff_multiplier: 2.0,
            jitter_ms: 0,
        };
        assert_eq!(policy.delay_for_attempt(1, 0), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2, 0), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3, 0), Duration::from_millis(800));
        assert_eq!(policy.delay_for_attempt(4, 0), Duration::from_millis(900));
    }

    #[test]
    fn every_phase_has_a_default_policy() {
        let table = PolicyTable::default();
        assert_eq!(table.get(Phase::Rendering).max_attempts, 3);
    }
}
