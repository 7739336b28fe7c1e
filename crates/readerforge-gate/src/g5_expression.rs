//! G5 — expression lexer: a plot expression tokenizes to a closed
//! allow-list (numbers, identifiers in the named function/constant set,
//! arithmetic and comparison operators, parentheses). The grammar itself
//! already rejects dangerous patterns (G5's lexer shares `expr_eval`'s
//! grammar, which has no lexical path to a call into the host evaluator,
//! the filesystem, or the network); this gate additionally enforces the
//! function/constant allow-list and a complexity ceiling.

use crate::expr_eval::{self, ALLOWED_CONSTANTS, ALLOWED_FUNCTIONS};
use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

const COMPLEXITY_CEILING: u32 = 64;

pub struct ExpressionGate;

impl Gate for ExpressionGate {
    fn id(&self) -> &'static str {
        "g5"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Expression { source } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(source)
    }
}

#[must_use]
pub fn validate(source: &str) -> GateOutcome {
    let expr = match expr_eval::parse(source) {
        Ok(expr) => expr,
        Err(detail) => return GateOutcome::fail(GateError::MalformedExpression(detail)),
    };

    let mut errors = Vec::new();

    for name in expr_eval::identifiers(&expr) {
        let is_known_function = ALLOWED_FUNCTIONS.contains(name.as_str());
        let is_known_constant = ALLOWED_CONSTANTS.contains(name.as_str());
        let is_plot_variable = name == "x";
        if !is_known_function && !is_known_constant && !is_plot_variable {
            errors.push(GateError::DisallowedToken { token: name });
        }
    }

    let complexity = expr_eval::complexity_score(&expr);
    if complexity > COMPLEXITY_CEILING {
        errors.push(GateError::ComplexityExceeded {
            actual: complexity,
            ceiling: COMPLEXITY_CEILING,
        });
    }

    GateOutcome::fail_many(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_plot_expression() {
        let outcome = validate("sin(x) + 0.5 * cos(2 * x)");
        assert!(outcome.valid);
    }

    #[test]
    fn rejects_an_identifier_outside_the_allow_list() {
        let outcome = validate("eval(x)");
        assert!(!outcome.valid);
        assert!(matches!(
            outcome.errors[0],
            GateError::DisallowedToken { .. }
        ));
    }

    #[test]
    fn rejects_characters_outside_the_grammar() {
        let outcome = validate("import os; x");
        assert!(!outcome.valid);
    }

    #[test]
    fn rejects_expressions_above_the_complexity_ceiling() {
        let deep = (0..40).map(|_| "sin(x)").collect::<Vec<_>>().join(" + ");
        let outcome = validate(&deep);
        assert!(!outcome.valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| matches!(e, GateError::ComplexityExceeded { .. })));
    }
}
