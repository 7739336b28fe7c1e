use std::collections::HashMap;
use std::sync::Mutex;

use crate::Phase;

#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseCounters {
    pub successes: u64,
    pub failures: u64,
    /// Every call into `operation`, including the first try, summed across
    /// every `execute` invocation for this phase.
    pub attempts: u64,
}

#[derive(Default)]
pub struct RetryStats {
    counters: Mutex<HashMap<Phase, PhaseCounters>>,
}

impl RetryStats {
    pub(crate) fn record_attempt(&self, phase: Phase) {
        self.counters.lock().unwrap().entry(phase).or_default().attempts += 1;
    }

    pub(crate) fn record_success(&self, phase: Phase) {
        self.counters.lock().unwrap().entry(phase).or_default().successes += 1;
    }

    pub(crate) fn record_failure(&self, phase: Phase) {
        self.counters.lock().unwrap().entry(phase).or_default().failures += 1;
    }

    #[must_use]
    pub fn for_phase(&self, phase: Phase) -> PhaseCounters {
        self.counters.lock().unwrap().get(&phase).copied().unwrap_or_default()
    }

    /// Sum of `attempts` across every phase this executor has driven, for
    /// run-level reporting that doesn't care which phase a retry came from.
    #[must_use]
    pub fn total_attempts(&self) -> u64 {
        self.counters.lock().unwrap().values().map(|c| c.attempts).sum()
    }
}
