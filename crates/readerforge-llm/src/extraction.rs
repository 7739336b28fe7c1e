//! Tolerant extraction: when the remote doesn't emit a structured object
//! conforming to the requested schema, fall back to locating plausible
//! content in its raw text. Best-effort only — validation gates remain the
//! source of truth for correctness.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::GenerationResponse;

static DOLLAR_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$").expect("valid regex"));
static BRACKET_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\\[(.+?)\\\]").expect("valid regex"));
static LATEX_COMMAND_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*\\[a-zA-Z]+.*$").expect("valid regex"));

/// Extract a value conforming to `schema` from `response`: prefer the
/// declared structured field; otherwise fall back to the raw text,
/// applying the equation-specific LaTeX extraction when `schema`
/// indicates an equation payload.
#[must_use]
pub fn tolerant_extract(schema: &str, response: &GenerationResponse) -> Option<Value> {
    if let Some(structured) = &response.structured {
        return Some(structured.clone());
    }

    if schema.eq_ignore_ascii_case("equation") {
        return extract_latex(&response.raw_text).map(Value::String);
    }

    longest_plausible_text(&response.raw_text).map(Value::String)
}

/// First well-formed LaTeX delimited by `$$…$$`, `\[…\]`, or a line
/// containing a LaTeX command.
fn extract_latex(raw: &str) -> Option<String> {
    if let Some(caps) = DOLLAR_BLOCK.captures(raw) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = BRACKET_BLOCK.captures(raw) {
        return Some(caps[1].trim().to_string());
    }
    raw.lines()
        .find(|line| LATEX_COMMAND_LINE.is_match(line))
        .map(|line| line.trim().to_string())
}

/// The longest contiguous non-blank paragraph, treated as the most
/// plausible candidate body when nothing more structured is available.
fn longest_plausible_text(raw: &str) -> Option<String> {
    raw.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .max_by_key(|block| block.len())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(raw_text: &str) -> GenerationResponse {
        GenerationResponse {
            structured: None,
            raw_text: raw_text.to_string(),
        }
    }

    #[test]
    fn prefers_declared_structured_field() {
        let mut resp = response("ignored");
        resp.structured = Some(serde_json::json!({"value": 1}));
        assert_eq!(
            tolerant_extract("equation", &resp),
            Some(serde_json::json!({"value": 1}))
        );
    }

    #[test]
    fn extracts_dollar_delimited_latex() {
        let resp = response("some preamble\n$$ v = u + a t $$\ntrailing");
        assert_eq!(
            tolerant_extract("equation", &resp),
            Some(Value::String("v = u + a t".to_string()))
        );
    }

    #[test]
    fn extracts_bracket_delimited_latex_when_no_dollar_block() {
        let resp = response("text \\[ x^2 + y^2 = r^2 \\] more text");
        assert_eq!(
            tolerant_extract("equation", &resp),
            Some(Value::String("x^2 + y^2 = r^2".to_string()))
        );
    }

    #[test]
    fn falls_back_to_longest_paragraph_for_non_equation_schemas() {
        let resp = response("short\n\nthis is a much longer paragraph of prose content");
        assert_eq!(
            tolerant_extract("prose", &resp),
            Some(Value::String(
                "this is a much longer paragraph of prose content".to_string()
            ))
        );
    }
}
