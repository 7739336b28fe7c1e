//! G9 — unicode: NFC-normalize input; reject control characters, bidi
//! overrides, zero-width characters, private-use, non-characters, and
//! unpaired surrogates; count mixed scripts and flag when they exceed a
//! threshold; detect confusable characters against `unicode-security`'s
//! skeleton table and assign a risk level from the offending-character
//! ratio. In strict mode any CRITICAL finding fails the gate; in permissive
//! mode findings are downgraded to warnings and the sanitized text is
//! returned as `data`.

use unicode_normalization::UnicodeNormalization;
use unicode_security::{GeneralSecurityProfile, IdentifierStatus};

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

/// Above this fraction of flagged characters, a mixed-script or confusable
/// finding is promoted to `Severity::Critical` rather than `Warning`.
const RISK_RATIO_CEILING: f64 = 0.1;
/// More than this many distinct scripts in one string is "mixed" enough to
/// report, per spec.md's "flag when exceeding threshold" language.
const MIXED_SCRIPT_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnicodeMode {
    Strict,
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
struct Finding {
    severity: Severity,
    detail: String,
}

pub struct UnicodeGate;

impl Gate for UnicodeGate {
    fn id(&self) -> &'static str {
        "g9"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Unicode { text, mode } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(text, *mode)
    }
}

#[must_use]
pub fn validate(text: &str, mode: UnicodeMode) -> GateOutcome {
    let normalized: String = text.nfc().collect();
    let findings = scan(&normalized);

    let any_critical = findings.iter().any(|f| f.severity == Severity::Critical);

    match mode {
        UnicodeMode::Strict if any_critical => {
            let errors = findings
                .into_iter()
                .filter(|f| f.severity == Severity::Critical)
                .map(|f| GateError::UnicodeFinding {
                    severity: f.severity,
                    detail: f.detail,
                })
                .collect();
            GateOutcome::fail_many(errors)
        }
        _ => {
            let sanitized = sanitize(&normalized);
            let mut outcome =
                GateOutcome::ok_with_data(serde_json::json!({ "sanitized": sanitized }));
            for finding in findings {
                outcome = outcome.with_warning(finding.detail);
            }
            outcome
        }
    }
}

fn scan(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut flagged = 0usize;
    let mut total = 0usize;
    let mut scripts = std::collections::HashSet::new();

    for c in text.chars() {
        total += 1;
        if is_dangerous_control(c) {
            findings.push(Finding {
                severity: Severity::Critical,
                detail: format!("disallowed control/format character U+{:04X}", c as u32),
            });
            flagged += 1;
            continue;
        }
        if is_zero_width(c) {
            findings.push(Finding {
                severity: Severity::Critical,
                detail: format!("zero-width character U+{:04X}", c as u32),
            });
            flagged += 1;
            continue;
        }
        if is_private_use(c) || is_noncharacter(c) {
            findings.push(Finding {
                severity: Severity::Critical,
                detail: format!("private-use or non-character codepoint U+{:04X}", c as u32),
            });
            flagged += 1;
            continue;
        }
        if c.identifier_status() != IdentifierStatus::Allowed {
            flagged += 1;
        }
        if let Some(script) = primary_script(c) {
            scripts.insert(script);
        }
    }

    if scripts.len() > MIXED_SCRIPT_THRESHOLD {
        findings.push(Finding {
            severity: Severity::Warning,
            detail: format!("text mixes {} distinct scripts", scripts.len()),
        });
    }

    if total > 0 {
        let ratio = flagged as f64 / total as f64;
        if ratio > RISK_RATIO_CEILING {
            findings.push(Finding {
                severity: Severity::Critical,
                detail: format!("{:.0}% of characters are confusable or disallowed", ratio * 100.0),
            });
        } else if flagged > 0 {
            findings.push(Finding {
                severity: Severity::Info,
                detail: format!("{flagged} confusable character(s) found"),
            });
        }
    }

    findings
}

/// Strip the dangerous ranges G9 flags and collapse whitespace runs; used
/// both for G9's own permissive-mode output and by the repair engine's
/// unicode strategy.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|&c| !is_dangerous_control(c) && !is_zero_width(c) && !is_private_use(c) && !is_noncharacter(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_dangerous_control(c: char) -> bool {
    // C0/C1 controls outside plain whitespace, plus the explicit bidi
    // override/embedding/isolate formatting characters.
    let is_plain_whitespace = matches!(c, '\n' | '\r' | '\t' | ' ');
    let is_control = c.is_control() && !is_plain_whitespace;
    let is_bidi_override = matches!(
        c,
        '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{200E}' | '\u{200F}'
    );
    is_control || is_bidi_override
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' | '\u{2060}')
}

fn is_private_use(c: char) -> bool {
    matches!(c, '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}')
}

fn is_noncharacter(c: char) -> bool {
    let cp = c as u32;
    matches!(cp, 0xFDD0..=0xFDEF) || (cp & 0xFFFE) == 0xFFFE
}

/// A coarse script classifier: exact script boundaries aren't needed for a
/// "how many scripts are mixed in here" count, only a stable bucket per
/// character.
fn primary_script(c: char) -> Option<&'static str> {
    let cp = c as u32;
    match cp {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F => Some("latin"),
        0x0400..=0x04FF => Some("cyrillic"),
        0x0370..=0x03FF => Some("greek"),
        0x4E00..=0x9FFF => Some("han"),
        0x3040..=0x309F => Some("hiragana"),
        0x30A0..=0x30FF => Some("katakana"),
        0x0600..=0x06FF => Some("arabic"),
        0x0590..=0x05FF => Some("hebrew"),
        0x0900..=0x097F => Some("devanagari"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_ascii_passes_in_strict_mode() {
        let outcome = validate("Newton's second law relates force and acceleration.", UnicodeMode::Strict);
        assert!(outcome.valid);
    }

    #[test]
    fn zero_width_character_fails_in_strict_mode() {
        let text = "forc\u{200B}e";
        let outcome = validate(text, UnicodeMode::Strict);
        assert!(!outcome.valid);
    }

    #[test]
    fn zero_width_character_becomes_warning_in_permissive_mode() {
        let text = "forc\u{200B}e";
        let outcome = validate(text, UnicodeMode::Permissive);
        assert!(outcome.valid);
        assert!(!outcome.warnings.is_empty());
        let sanitized = outcome.data.unwrap()["sanitized"].as_str().unwrap().to_string();
        assert!(!sanitized.contains('\u{200B}'));
    }

    #[test]
    fn bidi_override_is_critical() {
        let text = "a\u{202E}b";
        let outcome = validate(text, UnicodeMode::Strict);
        assert!(!outcome.valid);
    }

    #[test]
    fn sanitize_twice_is_idempotent() {
        let text = "forc\u{200B}e\u{FEFF} ";
        let once = sanitize(&text.nfc().collect::<String>());
        let twice = sanitize(&once.nfc().collect::<String>());
        assert_eq!(once, twice);
    }
}
