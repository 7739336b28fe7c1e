//! The attempt-bounding half of the repair engine. Each `(module,
//! correlationId, errorKind)` triple gets its own counter against a
//! per-kind maximum; once exhausted, further attempts are refused rather
//! than silently retried forever.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// Per-error-kind maximum repair attempts. Unknown kinds are not in this
/// table at all, which `RepairEngine::begin_attempt` treats as "manual
/// review only" per spec.md §4.9.
static MAX_ATTEMPTS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("schema-missing-field", 2),
        ("latex-unbalanced", 2),
        ("latex-unknown-command", 2),
        ("numeric-parens", 2),
        ("numeric-tolerance", 2),
        ("smiles-invalid", 2),
        ("plot-expression", 2),
        ("unicode", 2),
        ("cross-ref", 3),
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RepairError {
    #[error("repair attempts exhausted for kind '{kind}' ({attempts} tried)")]
    AttemptsExhausted { kind: String, attempts: u32 },
    #[error("no repair strategy registered for kind '{kind}'; flagged for manual review")]
    ManualReviewRequired { kind: String },
}

/// Tracks how many repair attempts have been spent on each
/// `(module, correlationId, errorKind)` triple across a pipeline run.
#[derive(Default)]
pub struct RepairEngine {
    counters: Mutex<HashMap<(String, String, String), u32>>,
}

impl RepairEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next attempt slot for `kind` under `(module,
    /// correlationId)`. Returns the 1-based attempt number on success.
    pub fn begin_attempt(
        &self,
        module: &str,
        correlation_id: &str,
        kind: &str,
    ) -> Result<u32, RepairError> {
        let Some(&max) = MAX_ATTEMPTS.get(kind) else {
            return Err(RepairError::ManualReviewRequired {
                kind: kind.to_string(),
            });
        };

        let mut counters = self.counters.lock().expect("repair counter mutex poisoned");
        let key = (module.to_string(), correlation_id.to_string(), kind.to_string());
        let count = counters.entry(key).or_insert(0);
        if *count >= max {
            return Err(RepairError::AttemptsExhausted {
                kind: kind.to_string(),
                attempts: *count,
            });
        }
        *count += 1;
        Ok(*count)
    }

    /// The number of attempts already spent on `(module, correlationId,
    /// kind)`, for diagnostics and tests.
    #[must_use]
    pub fn attempts_spent(&self, module: &str, correlation_id: &str, kind: &str) -> u32 {
        self.counters
            .lock()
            .expect("repair counter mutex poisoned")
            .get(&(module.to_string(), correlation_id.to_string(), kind.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_bounded_per_kind() {
        let engine = RepairEngine::new();
        assert_eq!(engine.begin_attempt("m3", "corr-1", "latex-unbalanced").unwrap(), 1);
        assert_eq!(engine.begin_attempt("m3", "corr-1", "latex-unbalanced").unwrap(), 2);
        assert!(engine.begin_attempt("m3", "corr-1", "latex-unbalanced").is_err());
    }

    #[test]
    fn distinct_correlation_ids_have_independent_counters() {
        let engine = RepairEngine::new();
        engine.begin_attempt("m3", "corr-1", "smiles-invalid").unwrap();
        engine.begin_attempt("m3", "corr-1", "smiles-invalid").unwrap();
        // corr-2 has never attempted this kind, so it still has budget.
        assert!(engine.begin_attempt("m3", "corr-2", "smiles-invalid").is_ok());
    }

    #[test]
    fn unknown_kind_is_manual_review() {
        let engine = RepairEngine::new();
        let err = engine.begin_attempt("m3", "corr-1", "totally-unknown-kind").unwrap_err();
        assert!(matches!(err, RepairError::ManualReviewRequired { .. }));
    }
}
