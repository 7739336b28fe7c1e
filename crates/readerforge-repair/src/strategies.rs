//! Pure, per-error-kind repair strategies (spec.md §4.9). Every strategy
//! takes owned/borrowed content and returns a patched value plus a
//! `RepairLogEntry` describing what changed — no strategy retries
//! internally, and none of them consult the attempt counter in
//! [`crate::engine::RepairEngine`]; that bookkeeping is the caller's job.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use readerforge_types::section::RepairLogEntry;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Every shape a repair strategy might be asked to patch.
pub enum RepairInput<'a> {
    SchemaMissingField {
        instance: &'a serde_json::Value,
        defaults: &'a HashMap<String, serde_json::Value>,
    },
    LatexUnbalanced {
        source: &'a str,
    },
    LatexUnknownCommand {
        source: &'a str,
    },
    NumericParens {
        expr: &'a str,
    },
    NumericTolerance {
        tolerance: f64,
    },
    Smiles {
        smiles: &'a str,
    },
    PlotExpression {
        expr: &'a str,
    },
    Unicode {
        text: &'a str,
    },
    CrossRef {
        colliding_id: &'a str,
        suffix: u32,
    },
}

#[derive(Debug, Clone)]
pub enum Patched {
    Json(serde_json::Value),
    Text(String),
    Number(f64),
}

pub struct RepairOutcome {
    pub patched: Patched,
    pub log: RepairLogEntry,
}

#[must_use]
pub fn apply(input: RepairInput<'_>, attempt: u32) -> RepairOutcome {
    match input {
        RepairInput::SchemaMissingField { instance, defaults } => schema_missing_field(instance, defaults, attempt),
        RepairInput::LatexUnbalanced { source } => latex_unbalanced(source, attempt),
        RepairInput::LatexUnknownCommand { source } => latex_unknown_command(source, attempt),
        RepairInput::NumericParens { expr } => numeric_parens(expr, attempt),
        RepairInput::NumericTolerance { tolerance } => numeric_tolerance(tolerance, attempt),
        RepairInput::Smiles { smiles } => smiles_invalid(smiles, attempt),
        RepairInput::PlotExpression { expr } => plot_expression(expr, attempt),
        RepairInput::Unicode { text } => unicode(text, attempt),
        RepairInput::CrossRef { colliding_id, suffix } => cross_ref(colliding_id, suffix, attempt),
    }
}

fn log(kind: &str, attempt: u32, succeeded: bool, description: impl Into<String>) -> RepairLogEntry {
    RepairLogEntry {
        error_kind: kind.to_string(),
        attempt,
        succeeded,
        description: description.into(),
    }
}

fn schema_missing_field(
    instance: &serde_json::Value,
    defaults: &HashMap<String, serde_json::Value>,
    attempt: u32,
) -> RepairOutcome {
    let mut patched = instance.clone();
    let mut filled = Vec::new();
    if let Some(obj) = patched.as_object_mut() {
        for (field, default) in defaults {
            if !obj.contains_key(field) {
                obj.insert(field.clone(), default.clone());
                filled.push(field.clone());
            }
        }
    }
    let succeeded = !filled.is_empty();
    RepairOutcome {
        patched: Patched::Json(patched),
        log: log(
            "schema-missing-field",
            attempt,
            succeeded,
            if succeeded {
                format!("populated missing field(s): {}", filled.join(", "))
            } else {
                "no missing fields had a default to populate".to_string()
            },
        ),
    }
}

/// Appends closing delimiters to match an excess of `{`, `\[`, or `$$`.
fn latex_unbalanced(source: &str, attempt: u32) -> RepairOutcome {
    let mut patched = source.to_string();
    let mut applied = Vec::new();

    let open_braces = source.matches('{').count();
    let close_braces = source.matches('}').count();
    if open_braces > close_braces {
        let deficit = open_braces - close_braces;
        patched.push_str(&"}".repeat(deficit));
        applied.push(format!("appended {deficit} closing brace(s)"));
    }

    let open_brackets = source.matches(r"\[").count();
    let close_brackets = source.matches(r"\]").count();
    if open_brackets > close_brackets {
        let deficit = open_brackets - close_brackets;
        patched.push_str(&r"\]".repeat(deficit));
        applied.push(format!("appended {deficit} closing \\] delimiter(s)"));
    }

    if source.matches("$$").count() % 2 == 1 {
        patched.push_str("$$");
        applied.push("appended a closing $$ delimiter".to_string());
    }

    let succeeded = !applied.is_empty();
    RepairOutcome {
        patched: Patched::Text(patched),
        log: log(
            "latex-unbalanced",
            attempt,
            succeeded,
            if succeeded {
                applied.join("; ")
            } else {
                "source was already balanced".to_string()
            },
        ),
    }
}

static LATEX_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([a-zA-Z]+)").unwrap());

static KNOWN_REPLACEMENTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("darr", "downarrow"),
        ("uarr", "uparrow"),
        ("rarr", "rightarrow"),
        ("larr", "leftarrow"),
        ("dfrac", "frac"),
        ("tfrac", "frac"),
        ("varepsilon", "epsilon"),
        ("implies", "Rightarrow"),
    ]
    .into_iter()
    .collect()
});

/// Known-safe LaTeX commands this pipeline expects to see; anything else
/// that has no known replacement gets its backslash stripped so it degrades
/// to plain text rather than failing the TeX parser a second time.
static KNOWN_SAFE_COMMANDS: Lazy<std::collections::HashSet<&'static str>> = Lazy::new(|| {
    [
        "frac", "sqrt", "sum", "int", "lim", "infty", "partial", "nabla", "cdot", "times", "div",
        "pm", "mp", "leq", "geq", "neq", "approx", "sim", "propto", "alpha", "beta", "gamma",
        "delta", "epsilon", "theta", "lambda", "mu", "pi", "sigma", "phi", "omega", "Delta",
        "Sigma", "Omega", "text", "mathrm", "left", "right", "begin", "end", "downarrow",
        "uparrow", "rightarrow", "leftarrow", "Rightarrow", "Leftarrow",
    ]
    .into_iter()
    .collect()
});

fn latex_unknown_command(source: &str, attempt: u32) -> RepairOutcome {
    let mut substitutions = Vec::new();
    let patched = LATEX_COMMAND
        .replace_all(source, |caps: &regex::Captures<'_>| {
            let command = &caps[1];
            if KNOWN_SAFE_COMMANDS.contains(command) {
                format!("\\{command}")
            } else if let Some(replacement) = KNOWN_REPLACEMENTS.get(command) {
                substitutions.push(format!(r"\{command} -> \{replacement}"));
                format!("\\{replacement}")
            } else {
                substitutions.push(format!(r"\{command} -> {command} (backslash stripped)"));
                command.to_string()
            }
        })
        .into_owned();

    let succeeded = !substitutions.is_empty();
    RepairOutcome {
        patched: Patched::Text(patched),
        log: log(
            "latex-unknown-command",
            attempt,
            succeeded,
            if succeeded {
                substitutions.join("; ")
            } else {
                "no unknown commands found".to_string()
            },
        ),
    }
}

static CONSECUTIVE_OPERATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"([+\-*/])\1+").unwrap());

fn numeric_parens(expr: &str, attempt: u32) -> RepairOutcome {
    let mut applied = Vec::new();

    let open = expr.matches('(').count();
    let close = expr.matches(')').count();
    let mut patched = expr.to_string();
    if open > close {
        let deficit = open - close;
        patched.push_str(&")".repeat(deficit));
        applied.push(format!("balanced {deficit} unmatched opening parenthesis(es)"));
    } else if close > open {
        // Strip trailing unmatched closers rather than guess where an
        // opener belongs.
        let mut excess = close - open;
        let mut chars: Vec<char> = patched.chars().collect();
        let mut i = chars.len();
        while excess > 0 && i > 0 {
            i -= 1;
            if chars[i] == ')' {
                chars.remove(i);
                excess -= 1;
            }
        }
        patched = chars.into_iter().collect();
        applied.push(format!("removed {} unmatched closing parenthesis(es)", close - open));
    }

    if CONSECUTIVE_OPERATORS.is_match(&patched) {
        patched = CONSECUTIVE_OPERATORS.replace_all(&patched, "$1").into_owned();
        applied.push("collapsed consecutive operators".to_string());
    }

    let succeeded = !applied.is_empty();
    RepairOutcome {
        patched: Patched::Text(patched),
        log: log(
            "numeric-parens",
            attempt,
            succeeded,
            if succeeded {
                applied.join("; ")
            } else {
                "expression needed no parenthesis/operator repair".to_string()
            },
        ),
    }
}

/// Relax a numeric check's tolerance by a fixed factor; spec.md's seed
/// scenario #4 relaxes by 100x.
const TOLERANCE_RELAX_FACTOR: f64 = 100.0;

fn numeric_tolerance(tolerance: f64, attempt: u32) -> RepairOutcome {
    let relaxed = tolerance * TOLERANCE_RELAX_FACTOR;
    RepairOutcome {
        patched: Patched::Number(relaxed),
        log: log(
            "numeric-tolerance",
            attempt,
            true,
            format!("relaxed tolerance {tolerance} -> {relaxed} ({TOLERANCE_RELAX_FACTOR}x)"),
        ),
    }
}

fn smiles_invalid(smiles: &str, attempt: u32) -> RepairOutcome {
    let mut applied = Vec::new();

    let allowed: String = smiles
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '(' | ')' | '=' | '#' | '/' | '\\' | '[' | ']' | '+' | '-' | '@' | '%')
        })
        .collect();
    if allowed.len() != smiles.len() {
        applied.push("stripped invalid characters".to_string());
    }

    // A ring-closure digit that never finds its pair in a forward scan is
    // unclosed; drop every such digit from the string.
    let chars: Vec<char> = allowed.chars().collect();
    let mut keep = vec![true; chars.len()];
    let mut openings: HashMap<u32, usize> = HashMap::new();
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_digit() {
            let digit = c.to_digit(10).unwrap();
            if openings.remove(&digit).is_none() {
                openings.insert(digit, i);
            }
        }
    }
    if !openings.is_empty() {
        for &index in openings.values() {
            keep[index] = false;
        }
        applied.push("dropped unclosed ring-closure digit(s)".to_string());
    }

    let patched: String = chars
        .into_iter()
        .zip(keep)
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect();
    let patched = if patched.ends_with('(') {
        // A common fallout of both edits above: a dangling open branch left
        // by the character the numeric gate's caller already flagged.
        applied.push("removed a trailing unmatched branch opener".to_string());
        patched[..patched.len() - 1].to_string()
    } else {
        patched
    };

    let succeeded = !applied.is_empty();
    RepairOutcome {
        patched: Patched::Text(patched),
        log: log(
            "smiles-invalid",
            attempt,
            succeeded,
            if succeeded {
                applied.join("; ")
            } else {
                "SMILES needed no repair".to_string()
            },
        ),
    }
}

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());

fn plot_expression(expr: &str, attempt: u32) -> RepairOutcome {
    let allowed = readerforge_gate::expr_eval::ALLOWED_FUNCTIONS
        .iter()
        .chain(readerforge_gate::expr_eval::ALLOWED_CONSTANTS.iter())
        .copied()
        .collect::<std::collections::HashSet<_>>();

    let mut scrubbed = Vec::new();
    let patched = IDENTIFIER
        .replace_all(expr, |caps: &regex::Captures<'_>| {
            let token = &caps[0];
            if token == "x" || allowed.contains(token) {
                token.to_string()
            } else {
                scrubbed.push(token.to_string());
                "abs(".to_string()
            }
        })
        .into_owned();

    let succeeded = !scrubbed.is_empty();
    RepairOutcome {
        patched: Patched::Text(patched),
        log: log(
            "plot-expression",
            attempt,
            succeeded,
            if succeeded {
                format!("scrubbed disallowed token(s): {}", scrubbed.join(", "))
            } else {
                "expression had no disallowed tokens".to_string()
            },
        ),
    }
}

fn unicode(text: &str, attempt: u32) -> RepairOutcome {
    let normalized: String = text.nfc().collect();
    let sanitized = readerforge_gate::g9_unicode::sanitize(&normalized);
    let succeeded = sanitized != text;
    RepairOutcome {
        patched: Patched::Text(sanitized),
        log: log(
            "unicode",
            attempt,
            succeeded,
            if succeeded {
                "NFC-normalized, stripped dangerous ranges, collapsed whitespace".to_string()
            } else {
                "text was already clean".to_string()
            },
        ),
    }
}

fn cross_ref(colliding_id: &str, suffix: u32, attempt: u32) -> RepairOutcome {
    let patched = format!("{colliding_id}-r{suffix}");
    RepairOutcome {
        patched: Patched::Text(patched.clone()),
        log: log(
            "cross-ref",
            attempt,
            true,
            format!("regenerated colliding id '{colliding_id}' as '{patched}'"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latex_unbalanced_appends_missing_braces() {
        let outcome = apply(RepairInput::LatexUnbalanced { source: r"\frac{1}{2" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert_eq!(text, r"\frac{1}{2}");
        assert!(outcome.log.succeeded);
    }

    #[test]
    fn latex_unknown_command_substitutes_known_replacement() {
        let outcome = apply(RepairInput::LatexUnknownCommand { source: r"a \darr b" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert_eq!(text, r"a \downarrow b");
    }

    #[test]
    fn numeric_parens_balances_and_collapses_operators() {
        let outcome = apply(RepairInput::NumericParens { expr: "m * (a ++ b" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert!(text.ends_with(')'));
        assert!(!text.contains("++"));
    }

    #[test]
    fn smiles_strips_invalid_characters() {
        let outcome = apply(RepairInput::Smiles { smiles: "CC!O" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert_eq!(text, "CCO");
    }

    #[test]
    fn smiles_drops_unclosed_ring_digit() {
        let outcome = apply(RepairInput::Smiles { smiles: "C1CCCCC" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert!(!text.contains('1'));
    }

    #[test]
    fn plot_expression_scrubs_disallowed_identifier() {
        let outcome = apply(RepairInput::PlotExpression { expr: "eval(x)" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert!(text.starts_with("abs("));
    }

    #[test]
    fn unicode_repair_is_idempotent() {
        let once = apply(RepairInput::Unicode { text: "forc\u{200B}e" }, 1);
        let Patched::Text(once_text) = once.patched else { panic!("expected text") };
        let twice = apply(RepairInput::Unicode { text: &once_text }, 2);
        let Patched::Text(twice_text) = twice.patched else { panic!("expected text") };
        assert_eq!(once_text, twice_text);
    }

    #[test]
    fn cross_ref_regenerates_with_suffix() {
        let outcome = apply(RepairInput::CrossRef { colliding_id: "ch/001/eq-00", suffix: 1 }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert_eq!(text, "ch/001/eq-00-r1");
    }

    #[test]
    fn repair_applied_to_already_valid_latex_is_a_no_op() {
        let outcome = apply(RepairInput::LatexUnbalanced { source: r"\frac{1}{2}" }, 1);
        let Patched::Text(text) = outcome.patched else { panic!("expected text") };
        assert_eq!(text, r"\frac{1}{2}");
        assert!(!outcome.log.succeeded);
    }
}
