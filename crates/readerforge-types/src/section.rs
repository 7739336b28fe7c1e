//! SectionContext (adapter input) and SectionDoc (M3 output), spec.md §3.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::asset::{AssetSpec, ChemistrySpec, DiagramSpec, PlotSpec, WidgetSpec};
use crate::envelope::Envelope;
use crate::ids::ContentHash;

/// The inter-section carry: recap, introduced terms, used assets, and open
/// narrative threads. This is the only mechanism sections use to
/// communicate with one another.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunningState {
    /// A recap of at most 150 words, enforced by `Self::set_recap`.
    pub recap: String,
    pub terms_introduced: Vec<String>,
    pub asset_hashes_used: Vec<ContentHash>,
    pub open_threads: Vec<String>,
}

impl RunningState {
    /// Set the recap, truncating to the first 150 whitespace-delimited
    /// words if the supplied text runs longer.
    pub fn set_recap(&mut self, text: &str) {
        let words: Vec<&str> = text.split_whitespace().collect();
        self.recap = if words.len() > 150 {
            words[..150].join(" ")
        } else {
            words.join(" ")
        };
    }
}

/// A single section's identity plus the running state carried into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionContext {
    pub section_id: String,
    pub title: String,
    pub beat_ids: Vec<String>,
    pub body_with_markers: String,
    pub entry_transition: String,
    pub exit_transition: String,
    pub running_state_in: RunningState,
}

/// A numeric check record attached to an equation block (gate G4 input).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericCheck {
    pub vars: std::collections::BTreeMap<String, f64>,
    pub expr: String,
    pub expected: f64,
    pub tolerance: f64,
}

/// A single content block within a section (or, post-assembly, a
/// `ReaderDoc`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentBlock {
    Prose {
        id: String,
        markdown: String,
        word_count: usize,
    },
    Equation {
        id: String,
        latex: String,
        check: NumericCheck,
    },
    Plot {
        id: String,
        spec: PlotSpec,
    },
    Diagram {
        id: String,
        spec: DiagramSpec,
    },
    Chemistry {
        id: String,
        smiles: String,
        spec: ChemistrySpec,
    },
    Widget {
        id: String,
        spec: WidgetSpec,
    },
}

impl ContentBlock {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Prose { id, .. }
            | Self::Equation { id, .. }
            | Self::Plot { id, .. }
            | Self::Diagram { id, .. }
            | Self::Chemistry { id, .. }
            | Self::Widget { id, .. } => id,
        }
    }

    /// Returns the underlying `AssetSpec` for blocks that carry one.
    #[must_use]
    pub fn asset_spec(&self) -> Option<AssetSpec> {
        match self {
            Self::Plot { spec, .. } => Some(AssetSpec::Plot(spec.clone())),
            Self::Diagram { spec, .. } => Some(AssetSpec::Diagram(spec.clone())),
            Self::Chemistry { spec, .. } => Some(AssetSpec::Chem(spec.clone())),
            Self::Widget { spec, .. } => Some(AssetSpec::Widget(spec.clone())),
            Self::Prose { .. } | Self::Equation { .. } => None,
        }
    }

    /// Re-tag this block's id, used by M4 to assign globally unique ids and
    /// by the repair engine's cross-ref collision strategy.
    pub fn set_id(&mut self, new_id: String) {
        match self {
            Self::Prose { id, .. }
            | Self::Equation { id, .. }
            | Self::Plot { id, .. }
            | Self::Diagram { id, .. }
            | Self::Chemistry { id, .. }
            | Self::Widget { id, .. } => *id = new_id,
        }
    }
}

/// One gate's recorded outcome within a `ValidationReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRunRecord {
    pub gate_id: String,
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// A single repair attempt's audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairLogEntry {
    pub error_kind: String,
    pub attempt: u32,
    pub succeeded: bool,
    pub description: String,
}

/// Per-section validation outcome, carried alongside the content blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub gate_runs: Vec<GateRunRecord>,
    pub warnings: Vec<String>,
    pub repair_log: Vec<RepairLogEntry>,
}

impl ValidationReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.gate_runs.iter().all(|g| g.passed)
    }
}

/// M3's output: one section's ordered content blocks plus validation
/// evidence and the updated running state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDoc {
    pub envelope: Envelope,
    pub section_id: String,
    pub blocks: Vec<ContentBlock>,
    pub validation: ValidationReport,
    pub running_state_out: RunningState,
}

/// Bounded FIFO of section summaries kept for debugging/diagnostics; not
/// part of the spec's data model, purely an internal aid for the
/// orchestrator's structured logging.
#[derive(Debug, Default)]
pub struct RecentSections {
    capacity: usize,
    entries: VecDeque<String>,
}

impl RecentSections {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, section_id: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(section_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recap_truncates_to_150_words() {
        let mut state = RunningState::default();
        let long_text = (0..200).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        state.set_recap(&long_text);
        assert_eq!(state.recap.split_whitespace().count(), 150);
    }

    #[test]
    fn recap_preserves_short_text() {
        let mut state = RunningState::default();
        state.set_recap("a short recap");
        assert_eq!(state.recap, "a short recap");
    }
}
