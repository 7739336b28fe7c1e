//! G8 — cross-reference: every block id in a `ReaderDoc` is unique and any
//! textual references to other block ids (`[[block-id]]` markers embedded
//! in prose markdown) resolve to a block that actually exists.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use readerforge_types::{ContentBlock, ReaderDoc};
use regex::Regex;

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

static BLOCK_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([a-zA-Z0-9_/-]+)\]\]").expect("valid regex"));

pub struct CrossReferenceGate;

impl Gate for CrossReferenceGate {
    fn id(&self) -> &'static str {
        "g8"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::CrossReference { doc } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(doc)
    }
}

#[must_use]
pub fn validate(doc: &ReaderDoc) -> GateOutcome {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for block in &doc.blocks {
        if !seen.insert(block.id()) {
            errors.push(GateError::DuplicateBlockId(block.id().to_string()));
        }
    }

    for block in &doc.blocks {
        if let ContentBlock::Prose { markdown, .. } = block {
            for capture in BLOCK_REFERENCE.captures_iter(markdown) {
                let target = &capture[1];
                if !seen.contains(target) {
                    errors.push(GateError::DanglingReference(target.to_string()));
                }
            }
        }
    }

    GateOutcome::fail_many(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use readerforge_types::envelope::Producer;
    use readerforge_types::reader_doc::ReaderDocMeta;
    use readerforge_types::{ContentHash, CorrelationId, Difficulty, Envelope, Subject};

    fn doc(blocks: Vec<ContentBlock>) -> ReaderDoc {
        ReaderDoc {
            envelope: Envelope::new(
                Producer::Assemble,
                CorrelationId("corr-1".into()),
                ContentHash::from_hex(&"a".repeat(64)),
                Utc::now(),
            ),
            meta: ReaderDocMeta {
                title: "t".into(),
                subject: Subject::Physics,
                grade: "XI".into(),
                chapter: "Motion".into(),
                standard: "NCERT".into(),
                difficulty: Difficulty::Comfort,
                section_titles: vec![],
            },
            blocks,
        }
    }

    fn prose(id: &str, markdown: &str) -> ContentBlock {
        ContentBlock::Prose {
            id: id.to_string(),
            markdown: markdown.to_string(),
            word_count: markdown.split_whitespace().count(),
        }
    }

    #[test]
    fn accepts_unique_ids_and_resolvable_references() {
        let d = doc(vec![
            prose("001/prose-00", "see [[001/prose-01]] for more"),
            prose("001/prose-01", "details here"),
        ]);
        assert!(validate(&d).valid);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let d = doc(vec![prose("001/prose-00", "a"), prose("001/prose-00", "b")]);
        let outcome = validate(&d);
        assert!(!outcome.valid);
        assert!(matches!(outcome.errors[0], GateError::DuplicateBlockId(_)));
    }

    #[test]
    fn rejects_dangling_references() {
        let d = doc(vec![prose("001/prose-00", "see [[missing-block]]")]);
        let outcome = validate(&d);
        assert!(!outcome.valid);
        assert!(matches!(outcome.errors[0], GateError::DanglingReference(_)));
    }
}
