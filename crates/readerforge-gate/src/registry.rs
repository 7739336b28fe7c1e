//! The capability-interface plumbing: a shared `Gate` trait, a `GateInput`
//! enum covering every artifact kind a gate validates, and a registry the
//! orchestrator looks gates up in by id rather than hardcoding a call list.

use std::collections::HashMap;

use readerforge_types::{DiagramSpec, NumericCheck, Plan, ReaderDoc};

use crate::g9_unicode::UnicodeMode;
use crate::outcome::GateOutcome;

/// Every shape a gate might be asked to validate. A gate that receives a
/// variant it doesn't understand returns `GateOutcome::fail(WrongInputKind)`
/// rather than panicking — the registry is keyed by id precisely so callers
/// pick the right gate for the artifact they have.
pub enum GateInput<'a> {
    Schema {
        instance: &'a serde_json::Value,
        schema: &'a serde_json::Value,
    },
    BeatGraph {
        plan: &'a Plan,
    },
    Latex {
        source: &'a str,
    },
    Numeric {
        check: &'a NumericCheck,
        trials: u32,
    },
    Expression {
        source: &'a str,
    },
    Smiles {
        smiles: &'a str,
    },
    Diagram {
        spec: &'a DiagramSpec,
    },
    CrossReference {
        doc: &'a ReaderDoc,
    },
    Unicode {
        text: &'a str,
        mode: UnicodeMode,
    },
    Units {
        lhs_expr: &'a str,
        rhs_expr: &'a str,
        units: &'a HashMap<String, &'a str>,
    },
    Style {
        markdown: &'a str,
    },
}

/// A single named validation check. Implementations are pure: same input,
/// same outcome, no I/O.
pub trait Gate: Send + Sync {
    fn id(&self) -> &'static str;
    fn validate(&self, input: &GateInput<'_>) -> GateOutcome;
}

/// Gates keyed by id, so the orchestrator can select which gates apply to
/// a given artifact kind without a hardcoded match statement per call site.
#[derive(Default)]
pub struct GateRegistry {
    gates: HashMap<&'static str, Box<dyn Gate>>,
}

impl GateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            gates: HashMap::new(),
        }
    }

    /// Build a registry with every gate this crate defines registered under
    /// its spec id (`g1` .. `g12`, skipping the unused `g10`).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::g1_schema::SchemaGate));
        registry.register(Box::new(crate::g2_beat_graph::BeatGraphGate));
        registry.register(Box::new(crate::g3_latex::LatexGate));
        registry.register(Box::new(crate::g4_numeric::NumericGate::default()));
        registry.register(Box::new(crate::g5_expression::ExpressionGate));
        registry.register(Box::new(crate::g6_smiles::SmilesGate));
        registry.register(Box::new(crate::g7_diagram::DiagramGate));
        registry.register(Box::new(crate::g8_crossref::CrossReferenceGate));
        registry.register(Box::new(crate::g9_unicode::UnicodeGate));
        registry.register(Box::new(crate::g11_units::UnitsGate));
        registry.register(Box::new(crate::g12_style::StyleGate));
        registry
    }

    pub fn register(&mut self, gate: Box<dyn Gate>) {
        self.gates.insert(gate.id(), gate);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Gate> {
        self.gates.get(id).map(std::convert::AsRef::as_ref)
    }

    /// Every registered gate id, for the gate-totality property test (every
    /// gate named in the artifact kind table must show up here or be
    /// explicitly marked skipped by the caller).
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.gates.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn validate(&self, id: &str, input: &GateInput<'_>) -> Option<GateOutcome> {
        self.get(id).map(|gate| gate.validate(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_carries_every_spec_gate() {
        let registry = GateRegistry::with_defaults();
        assert_eq!(
            registry.ids(),
            vec![
                "g1", "g11", "g12", "g2", "g3", "g4", "g5", "g6", "g7", "g8", "g9"
            ]
        );
    }
}
