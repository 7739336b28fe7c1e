//! Validation gates G1-G12 (spec.md §4.8): independent, pure validators for
//! each pipeline artifact kind, exposed behind a single `Gate` capability
//! trait and looked up by id through `GateRegistry` rather than a hardcoded
//! dispatch per artifact kind.

pub mod expr_eval;
pub mod g1_schema;
pub mod g2_beat_graph;
pub mod g3_latex;
pub mod g4_numeric;
pub mod g5_expression;
pub mod g6_smiles;
pub mod g7_diagram;
pub mod g8_crossref;
pub mod g9_unicode;
pub mod g11_units;
pub mod g12_style;
pub mod lcg;
pub mod outcome;
pub mod registry;

pub use g9_unicode::{Severity, UnicodeMode};
pub use outcome::{GateError, GateOutcome};
pub use registry::{Gate, GateInput, GateRegistry};
