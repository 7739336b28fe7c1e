use unicode_normalization::UnicodeNormalization;

/// Normalize free text before it enters a canonicalized artifact:
/// Unicode NFC, CRLF/CR folded to LF, and runs of horizontal whitespace
/// collapsed to a single space. Leading/trailing whitespace on each line
/// is trimmed; a single trailing newline is enforced.
#[must_use]
pub fn normalize_text(input: &str) -> String {
    let nfc: String = input.nfc().collect();
    let unix_newlines = nfc.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = unix_newlines
        .lines()
        .map(collapse_horizontal_whitespace)
        .collect();

    while matches!(lines.last(), Some(line) if line.is_empty()) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn collapse_horizontal_whitespace(line: &str) -> String {
    let mut collapsed = String::with_capacity(line.len());
    let mut in_whitespace_run = false;
    for ch in line.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace_run {
                collapsed.push(' ');
                in_whitespace_run = true;
            }
        } else {
            collapsed.push(ch);
            in_whitespace_run = false;
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(normalize_text("a   b\tc"), "a b c\n");
    }

    #[test]
    fn folds_crlf_to_lf() {
        assert_eq!(normalize_text("a\r\nb\r\n"), "a\nb\n");
    }

    #[test]
    fn trims_trailing_blank_lines() {
        assert_eq!(normalize_text("a\n\n\n"), "a\n");
    }

    #[test]
    fn normalizes_to_nfc() {
        let decomposed = "e\u{0301}"; // e + combining acute accent
        let normalized = normalize_text(decomposed);
        assert_eq!(normalized, "\u{00e9}\n"); // precomposed é
    }
}
