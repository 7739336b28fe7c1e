//! G6 — SMILES: rejects invalid atoms, unclosed rings, and disallowed
//! characters; enforces bounds on atom/bond/ring counts. Not a full
//! chemistry parser — a structural lexer sufficient to catch the failure
//! modes an LLM actually produces (malformed bracket atoms, mismatched
//! ring-closure digits, runaway repetition).

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

const MAX_ATOMS: usize = 200;
const MAX_BONDS: usize = 400;
const MAX_RINGS: usize = 20;

static ORGANIC_SUBSET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I", "c", "n", "o", "s", "p"]
        .into_iter()
        .collect()
});

pub struct SmilesGate;

impl Gate for SmilesGate {
    fn id(&self) -> &'static str {
        "g6"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Smiles { smiles } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(smiles)
    }
}

#[must_use]
pub fn validate(smiles: &str) -> GateOutcome {
    let mut errors = Vec::new();
    let mut atom_count = 0usize;
    let mut bond_count = 0usize;
    let mut ring_openings: HashMap<u32, ()> = HashMap::new();
    let mut branch_depth = 0i32;

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                branch_depth += 1;
                i += 1;
            }
            ')' => {
                branch_depth -= 1;
                if branch_depth < 0 {
                    errors.push(GateError::InvalidSmiles(
                        "unmatched closing parenthesis".to_string(),
                    ));
                    branch_depth = 0;
                }
                i += 1;
            }
            '-' | '=' | '#' | '/' | '\\' => {
                bond_count += 1;
                i += 1;
            }
            '[' => {
                let close = chars[i..].iter().position(|&c| c == ']').map(|p| p + i);
                match close {
                    Some(end) => {
                        let inner: String = chars[i + 1..end].iter().collect();
                        if !is_valid_bracket_atom(&inner) {
                            errors.push(GateError::InvalidSmiles(format!(
                                "invalid bracket atom '[{inner}]'"
                            )));
                        }
                        atom_count += 1;
                        i = end + 1;
                    }
                    None => {
                        errors.push(GateError::InvalidSmiles(
                            "unclosed bracket atom".to_string(),
                        ));
                        i = chars.len();
                    }
                }
            }
            c if c.is_ascii_digit() => {
                let ring_id = c.to_digit(10).expect("ascii digit");
                if ring_openings.remove(&ring_id).is_none() {
                    ring_openings.insert(ring_id, ());
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let (symbol, consumed) = read_organic_symbol(&chars, i);
                if !ORGANIC_SUBSET.contains(symbol.as_str()) {
                    errors.push(GateError::InvalidSmiles(format!(
                        "unrecognized atom symbol '{symbol}'"
                    )));
                }
                atom_count += 1;
                i += consumed;
            }
            '%' => {
                // Two-digit ring bond number: %12.
                i += 1;
            }
            other => {
                errors.push(GateError::InvalidSmiles(format!(
                    "disallowed character '{other}'"
                )));
                i += 1;
            }
        }
    }

    if branch_depth != 0 {
        errors.push(GateError::InvalidSmiles(
            "unclosed branch parenthesis".to_string(),
        ));
    }
    if !ring_openings.is_empty() {
        errors.push(GateError::InvalidSmiles(
            "unclosed ring bond number".to_string(),
        ));
    }
    if atom_count > MAX_ATOMS {
        errors.push(GateError::InvalidSmiles(format!(
            "atom count {atom_count} exceeds the limit of {MAX_ATOMS}"
        )));
    }
    if bond_count > MAX_BONDS {
        errors.push(GateError::InvalidSmiles(format!(
            "explicit bond count {bond_count} exceeds the limit of {MAX_BONDS}"
        )));
    }
    let ring_count = ring_openings.len();
    if ring_count > MAX_RINGS {
        errors.push(GateError::InvalidSmiles(format!(
            "ring count {ring_count} exceeds the limit of {MAX_RINGS}"
        )));
    }

    GateOutcome::fail_many(errors)
}

fn is_valid_bracket_atom(inner: &str) -> bool {
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '@')
}

fn read_organic_symbol(chars: &[char], start: usize) -> (String, usize) {
    if start + 1 < chars.len() && chars[start].is_ascii_uppercase() && chars[start + 1].is_ascii_lowercase()
    {
        let two: String = chars[start..start + 2].iter().collect();
        if ORGANIC_SUBSET.contains(two.as_str()) {
            return (two, 2);
        }
    }
    (chars[start].to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ethanol() {
        let outcome = validate("CCO");
        assert!(outcome.valid);
    }

    #[test]
    fn rejects_unclosed_ring() {
        let outcome = validate("CC(O");
        // Unbalanced parenthesis, not a ring digit, but still invalid.
        assert!(!outcome.valid);
    }

    #[test]
    fn rejects_unclosed_ring_bond_number() {
        let outcome = validate("C1CCCCC");
        assert!(!outcome.valid);
    }

    #[test]
    fn accepts_benzene_ring() {
        let outcome = validate("c1ccccc1");
        assert!(outcome.valid);
    }

    #[test]
    fn rejects_unknown_atom_symbol() {
        let outcome = validate("CQC");
        assert!(!outcome.valid);
    }
}
