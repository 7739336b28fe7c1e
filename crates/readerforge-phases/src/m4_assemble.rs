//! M4 (Assemble): concatenates `SectionDoc`s (in their Scaffold-declared
//! order, which gives fan-in determinism regardless of M3 completion
//! order) into a single `ReaderDoc`, assigns globally unique block ids,
//! and checks G8 cross-references before finalizing metadata. No LLM call
//! — spec.md §4.10 describes M4 as pure assembly.

use chrono::Utc;
use readerforge_gate::GateInput;
use readerforge_types::{ContentBlock, Envelope, Producer, ReaderDoc, ReaderDocMeta};

use crate::stage::{Stage, StageContext, StageError, StageId};

/// Everything M4 needs beyond the ordered section docs: chapter-level
/// metadata that only the original request knows.
pub struct AssembleInput {
    pub chapter_slug: String,
    pub meta: ReaderDocMeta,
    pub sections: Vec<readerforge_types::SectionDoc>,
}

pub struct AssembleStage;

impl Stage for AssembleStage {
    type Input = AssembleInput;
    type Output = ReaderDoc;

    fn id(&self) -> StageId {
        StageId::Assemble
    }

    fn run(&self, ctx: &StageContext<'_>, input: Self::Input) -> Result<ReaderDoc, StageError> {
        let blocks: Vec<ContentBlock> = input
            .sections
            .into_iter()
            .flat_map(|section| section.blocks)
            .collect();

        let content_hash = readerforge_canon::hash_canonical_json(&blocks)?;
        let envelope = Envelope::new(Producer::Assemble, ctx.correlation_id.clone(), content_hash, Utc::now());

        let mut doc = ReaderDoc {
            envelope,
            meta: input.meta,
            blocks,
        };
        doc.reindex_blocks(&input.chapter_slug);

        let outcome = ctx
            .gates
            .validate("g8", &GateInput::CrossReference { doc: &doc })
            .expect("g8 is always registered");
        if !outcome.valid {
            return Err(StageError::GateFailed {
                gate_id: "g8".to_string(),
                detail: outcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
            });
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readerforge_types::{Difficulty, Subject};

    #[test]
    fn assemble_input_carries_given_metadata() {
        let meta = ReaderDocMeta {
            title: "Laws of Motion".to_string(),
            subject: Subject::Physics,
            grade: "XI".to_string(),
            chapter: "Motion".to_string(),
            standard: "NCERT".to_string(),
            difficulty: Difficulty::Comfort,
            section_titles: vec!["Intro".to_string()],
        };
        let input = AssembleInput {
            chapter_slug: "motion".to_string(),
            meta,
            sections: vec![],
        };
        assert_eq!(input.chapter_slug, "motion");
        assert!(input.sections.is_empty());
    }
}
