//! Shared outcome and error shape every gate returns, matching the
//! teacher's `GateResult`/`GateCondition` pair generalized to a single
//! pass/fail-with-structured-errors record per gate invocation.

use serde::{Deserialize, Serialize};

/// One gate's verdict on a single piece of input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateOutcome {
    pub valid: bool,
    pub errors: Vec<GateError>,
    pub warnings: Vec<String>,
    pub data: Option<serde_json::Value>,
}

impl GateOutcome {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            valid: true,
            data: Some(data),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fail(error: GateError) -> Self {
        Self {
            valid: false,
            errors: vec![error],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fail_many(errors: Vec<GateError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            ..Self::default()
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Every failure a gate can report, tagged so the repair engine can
/// dispatch on `kind()` without string-matching a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum GateError {
    #[error("gate received an input shape it does not validate")]
    WrongInputKind,

    #[error("schema violation at {pointer}: {detail}")]
    SchemaViolation { pointer: String, detail: String },

    #[error("beat '{beat_id}' violates the prereq DAG: {detail}")]
    BeatGraph { beat_id: String, detail: String },

    #[error("asset token '{token}' does not match the type:name grammar")]
    MalformedAssetToken { token: String },

    #[error("LaTeX parse error: {0}")]
    LatexParse(String),

    #[error("numeric check success ratio {ratio:.2} is below the {threshold:.2} threshold")]
    NumericBelowThreshold { ratio: f64, threshold: f64 },

    #[error("numeric check expression used a forbidden token: {0}")]
    ForbiddenToken(String),

    #[error("expression lexer rejected token '{token}'")]
    DisallowedToken { token: String },

    #[error("expression complexity {actual} exceeds the ceiling of {ceiling}")]
    ComplexityExceeded { actual: u32, ceiling: u32 },

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("invalid SMILES: {0}")]
    InvalidSmiles(String),

    #[error("diagram topology error: {0}")]
    DiagramTopology(String),

    #[error("duplicate block id '{0}'")]
    DuplicateBlockId(String),

    #[error("dangling reference to block '{0}'")]
    DanglingReference(String),

    #[error("unicode finding ({severity:?}): {detail}")]
    UnicodeFinding {
        severity: crate::g9_unicode::Severity,
        detail: String,
    },

    #[error("unit mismatch: left side is {lhs} but right side is {rhs}")]
    UnitMismatch { lhs: String, rhs: String },

    #[error("unit string '{0}' could not be parsed")]
    UnitParse(String),

    #[error("style violation: {0}")]
    StyleViolation(String),
}
