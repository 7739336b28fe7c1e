//! G12 — style: prose markdown must read as plain narrative prose, not a
//! structured document — no markdown headers, bullet/numbered lists, code
//! fences, or raw filename references. Each violation is reported with a
//! concrete repair suggestion the repair engine (or a human reviewer) can
//! apply directly.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

static HEADER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s").unwrap());
static BULLET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}[-*+]\s").unwrap());
static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}\d+[.)]\s").unwrap());
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```").unwrap());
static FILENAME_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w-]+\.(rs|py|js|ts|json|yaml|yml|toml|md|txt|cpp|java)\b").unwrap());

pub struct StyleGate;

impl Gate for StyleGate {
    fn id(&self) -> &'static str {
        "g12"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Style { markdown } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(markdown)
    }
}

#[must_use]
pub fn validate(markdown: &str) -> GateOutcome {
    let mut errors = Vec::new();

    if HEADER_LINE.is_match(markdown) {
        errors.push(GateError::StyleViolation(
            "contains a markdown header; rewrite as a topic sentence instead".to_string(),
        ));
    }
    if BULLET_LINE.is_match(markdown) {
        errors.push(GateError::StyleViolation(
            "contains a bulleted list; rewrite as connected prose sentences".to_string(),
        ));
    }
    if NUMBERED_LINE.is_match(markdown) {
        errors.push(GateError::StyleViolation(
            "contains a numbered list; rewrite as connected prose sentences".to_string(),
        ));
    }
    if CODE_FENCE.is_match(markdown) {
        errors.push(GateError::StyleViolation(
            "contains a code fence; prose blocks may not embed fenced code".to_string(),
        ));
    }
    if let Some(m) = FILENAME_REF.find(markdown) {
        errors.push(GateError::StyleViolation(format!(
            "contains a raw filename reference '{}'; describe the artifact instead of naming a file",
            m.as_str()
        )));
    }

    GateOutcome::fail_many(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prose_passes() {
        let outcome = validate("Newton's first law describes inertia in everyday terms.");
        assert!(outcome.valid);
    }

    #[test]
    fn header_line_fails() {
        let outcome = validate("## Section heading\n\nSome text.");
        assert!(!outcome.valid);
    }

    #[test]
    fn bulleted_list_fails() {
        let outcome = validate("Consider the following:\n- one\n- two");
        assert!(!outcome.valid);
    }

    #[test]
    fn code_fence_fails() {
        let outcome = validate("Here is code:\n```rust\nfn main() {}\n```");
        assert!(!outcome.valid);
    }

    #[test]
    fn filename_reference_fails() {
        let outcome = validate("See the implementation in solver.py for details.");
        assert!(!outcome.valid);
    }
}
