//! G11 — units: parse a unit string into a seven-tuple of base-dimension
//! exponents (length, mass, time, current, temperature, amount,
//! luminosity), parsing compound units split by multiplication (`*` or
//! `.`) and division (`/`), then unify an equation's two sides by
//! substituting each variable's declared dimension and checking the
//! resulting exponent vectors for equality.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

/// Exponents over (length, mass, time, current, temperature, amount,
/// luminosity) — SI base dimensions in the spec's declared order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dimension([i32; 7]);

impl Dimension {
    const fn base(index: usize) -> Self {
        let mut exps = [0i32; 7];
        exps[index] = 1;
        Self(exps)
    }

    fn mul(self, other: Self, power: i32) -> Self {
        let mut exps = self.0;
        for i in 0..7 {
            exps[i] += other.0[i] * power;
        }
        Self(exps)
    }

    fn pow(self, power: i32) -> Self {
        let mut exps = self.0;
        for e in &mut exps {
            *e *= power;
        }
        Self(exps)
    }
}

static BASE_UNITS: Lazy<HashMap<&'static str, Dimension>> = Lazy::new(|| {
    [
        ("m", Dimension::base(0)),
        ("kg", Dimension::base(1)),
        ("g", Dimension::base(1)),
        ("s", Dimension::base(2)),
        ("A", Dimension::base(3)),
        ("K", Dimension::base(4)),
        ("mol", Dimension::base(5)),
        ("cd", Dimension::base(6)),
        ("dimensionless", Dimension::default()),
    ]
    .into_iter()
    .collect()
});

pub struct UnitsGate;

impl Gate for UnitsGate {
    fn id(&self) -> &'static str {
        "g11"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Units {
            lhs_expr,
            rhs_expr,
            units,
        } = input
        else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(lhs_expr, rhs_expr, units)
    }
}

#[must_use]
pub fn validate(
    lhs_expr: &str,
    rhs_expr: &str,
    units: &HashMap<String, &str>,
) -> GateOutcome {
    let lhs = match dimension_of_term(lhs_expr, units) {
        Ok(d) => d,
        Err(e) => return GateOutcome::fail(e),
    };
    let rhs = match dimension_of_term(rhs_expr, units) {
        Ok(d) => d,
        Err(e) => return GateOutcome::fail(e),
    };

    if lhs == rhs {
        GateOutcome::ok()
    } else {
        GateOutcome::fail(GateError::UnitMismatch {
            lhs: describe(lhs),
            rhs: describe(rhs),
        })
    }
}

/// A "term" here is either a bare variable name (looked up in `units`) or a
/// unit expression of its own (e.g. `"m/s^2"`), which lets the equation's
/// two sides be either variable references or literal unit strings.
fn dimension_of_term(
    term: &str,
    units: &HashMap<String, &str>,
) -> Result<Dimension, GateError> {
    let term = term.trim();
    if let Some(unit_str) = units.get(term) {
        parse_unit(unit_str)
    } else {
        parse_compound(term, units)
    }
}

/// Parse a compound unit string such as `"kg*m/s^2"` or `"mol.cd/A^2"`
/// into its dimension vector, resolving every symbol against `BASE_UNITS`
/// only (no caller-supplied variable aliases).
pub fn parse_unit(unit: &str) -> Result<Dimension, GateError> {
    parse_compound(unit, &HashMap::new())
}

/// Parse a compound unit expression such as `"m*a"` or `"kg*m/s^2"`,
/// resolving each token against `units` (variable name -> declared unit
/// string) before falling back to `BASE_UNITS`, so a term built out of an
/// equation's own variable names resolves to the dimension its declared
/// unit carries rather than the dimension of a same-named base-unit symbol.
fn parse_compound(expr: &str, units: &HashMap<String, &str>) -> Result<Dimension, GateError> {
    let expr = expr.trim();
    if expr.is_empty() || expr == "1" || expr == "dimensionless" {
        return Ok(Dimension::default());
    }

    let mut dimension = Dimension::default();
    let mut sign = 1i32;
    let mut current = String::new();

    let flush = |token: &mut String, sign: i32, dim: &mut Dimension| -> Result<(), GateError> {
        if token.is_empty() {
            return Ok(());
        }
        let (symbol, exponent) = split_exponent(token)?;
        let base = resolve_symbol(&symbol, units)?;
        *dim = dim.mul(base, sign * exponent);
        token.clear();
        Ok(())
    };

    for c in expr.chars() {
        match c {
            '*' | '.' => {
                flush(&mut current, sign, &mut dimension)?;
                sign = 1;
            }
            '/' => {
                flush(&mut current, sign, &mut dimension)?;
                sign = -1;
            }
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }
    flush(&mut current, sign, &mut dimension)?;

    Ok(dimension)
}

/// Resolve one tokenized symbol (already split from its exponent) to a
/// dimension: a declared variable alias in `units` wins over a same-named
/// base-unit symbol.
fn resolve_symbol(symbol: &str, units: &HashMap<String, &str>) -> Result<Dimension, GateError> {
    if let Some(unit_str) = units.get(symbol) {
        return parse_unit(unit_str);
    }
    BASE_UNITS
        .get(symbol)
        .copied()
        .ok_or_else(|| GateError::UnitParse(format!("unknown base unit '{symbol}'")))
}

fn split_exponent(token: &str) -> Result<(String, i32), GateError> {
    if let Some((base, exp)) = token.split_once('^') {
        let exponent: i32 = exp
            .parse()
            .map_err(|_| GateError::UnitParse(format!("bad exponent in '{token}'")))?;
        Ok((base.to_string(), exponent))
    } else {
        Ok((token.to_string(), 1))
    }
}

fn describe(dim: Dimension) -> String {
    const NAMES: [&str; 7] = ["L", "M", "T", "I", "Θ", "N", "J"];
    let parts: Vec<String> = dim
        .0
        .iter()
        .zip(NAMES)
        .filter(|(exp, _)| **exp != 0)
        .map(|(exp, name)| format!("{name}^{exp}"))
        .collect();
    if parts.is_empty() {
        "dimensionless".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_equals_mass_times_acceleration() {
        let mut units = HashMap::new();
        units.insert("F".to_string(), "kg*m/s^2");
        units.insert("m".to_string(), "kg");
        units.insert("a".to_string(), "m/s^2");
        let outcome = validate("F", "m*a", &units);
        assert!(outcome.valid);
    }

    #[test]
    fn mismatched_sides_fail() {
        let mut units = HashMap::new();
        units.insert("F".to_string(), "kg*m/s^2");
        units.insert("v".to_string(), "m/s");
        let outcome = validate("F", "v", &units);
        assert!(!outcome.valid);
    }

    #[test]
    fn unparseable_unit_reports_unit_parse_error() {
        let units = HashMap::new();
        let outcome = validate("bogus_unit_xyz", "m", &units);
        assert!(!outcome.valid);
        assert!(matches!(outcome.errors[0], GateError::UnitParse(_)));
    }

    #[test]
    fn compound_unit_parses_consistently() {
        let a = parse_unit("kg*m/s^2").unwrap();
        let b = parse_unit("kg.m/s^2").unwrap();
        assert_eq!(a, b);
    }
}
