//! Seed scenario: a numeric check whose expression has an unbalanced
//! parenthesis fails G4 at the parse step, gets one bounded repair attempt
//! that balances the expression, and then passes.

use std::collections::BTreeMap;

use readerforge_gate::{GateInput, GateRegistry};
use readerforge_repair::strategies::{apply, Patched, RepairInput};
use readerforge_repair::RepairEngine;
use readerforge_types::NumericCheck;

fn check(expr: &str) -> NumericCheck {
    let mut vars = BTreeMap::new();
    vars.insert("m".to_string(), 2.0);
    vars.insert("a".to_string(), 5.0);
    NumericCheck {
        vars,
        expr: expr.to_string(),
        expected: 10.0,
        tolerance: 0.5,
    }
}

#[test]
fn an_unbalanced_expression_is_balanced_by_repair_and_then_passes_g4() {
    let gates = GateRegistry::with_defaults();
    let repair = RepairEngine::new();

    let broken = check("m * (a");
    let first = gates.validate("g4", &GateInput::Numeric { check: &broken, trials: 5 }).unwrap();
    assert!(!first.valid, "an unbalanced expression should fail to parse under g4");

    let attempt = repair.begin_attempt("m3", "corr-numeric", "numeric-parens").unwrap();
    let outcome = apply(RepairInput::NumericParens { expr: &broken.expr }, attempt);
    let Patched::Text(patched_expr) = outcome.patched else {
        panic!("numeric-parens repair should return patched text");
    };

    let fixed = NumericCheck {
        expr: patched_expr,
        ..broken
    };
    let second = gates.validate("g4", &GateInput::Numeric { check: &fixed, trials: 5 }).unwrap();
    assert!(second.valid, "the balanced expression should pass g4: {second:?}");
}
