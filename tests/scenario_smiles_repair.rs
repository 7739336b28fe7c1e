//! Seed scenario: an invalid SMILES string fails G6, gets one bounded
//! repair attempt that patches the specific defect, and re-validates clean
//! on the patched string.

use readerforge_gate::{GateInput, GateRegistry};
use readerforge_repair::strategies::{apply, Patched, RepairInput};
use readerforge_repair::RepairEngine;

#[test]
fn an_unclosed_ring_bond_is_patched_and_then_passes_g6() {
    let gates = GateRegistry::with_defaults();
    let repair = RepairEngine::new();

    let bad_smiles = "C1CCCCC";
    let first = gates
        .validate("g6", &GateInput::Smiles { smiles: bad_smiles })
        .unwrap();
    assert!(!first.valid, "an unclosed ring bond number should fail g6");

    let attempt = repair.begin_attempt("m3", "corr-smiles", "smiles-invalid").unwrap();
    assert_eq!(attempt, 1);

    let outcome = apply(RepairInput::Smiles { smiles: bad_smiles }, attempt);
    let Patched::Text(patched) = outcome.patched else {
        panic!("smiles repair should return patched text");
    };

    let second = gates.validate("g6", &GateInput::Smiles { smiles: &patched }).unwrap();
    assert!(second.valid, "the patched SMILES string should pass g6: {second:?}");
}

#[test]
fn repair_attempts_for_the_same_correlation_id_are_bounded() {
    let repair = RepairEngine::new();
    repair.begin_attempt("m3", "corr-bounded", "smiles-invalid").unwrap();
    repair.begin_attempt("m3", "corr-bounded", "smiles-invalid").unwrap();
    assert!(
        repair.begin_attempt("m3", "corr-bounded", "smiles-invalid").is_err(),
        "a third attempt on the same correlation id should be refused"
    );
}
