//! M2 (Scaffold): groups a Plan's beats into sections per the difficulty's
//! grouping factor, synthesizes each section's title from its leading
//! beat's headline, and asks the LLM to draft transition prose and asset
//! placement markers for each section in turn.

use chrono::Utc;
use readerforge_llm::GenerationOptions;
use readerforge_types::{Envelope, Plan, Producer, Scaffold, ScaffoldSection as Section};
use serde::Deserialize;

use crate::stage::{Stage, StageContext, StageError, StageId};

pub struct ScaffoldStage;

#[derive(Debug, Deserialize)]
struct SectionDraft {
    body_with_markers: String,
    entry_transition: String,
    exit_transition: String,
    concept_sequence: Vec<String>,
}

impl Stage for ScaffoldStage {
    type Input = Plan;
    type Output = Scaffold;

    fn id(&self) -> StageId {
        StageId::Scaffold
    }

    fn run(&self, ctx: &StageContext<'_>, plan: Plan) -> Result<Scaffold, StageError> {
        let group_size = plan.difficulty.beats_per_section();
        let mut sections = Vec::new();

        for (sequence, group) in plan.beats.chunks(group_size).enumerate() {
            let title = group
                .first()
                .map_or_else(|| "Untitled section".to_string(), |beat| beat.headline.clone());
            let beat_ids: Vec<String> = group.iter().map(|beat| beat.id.clone()).collect();

            let prompt = prompt_for(&plan.title, &title, group);
            let options = GenerationOptions {
                schema: "scaffold-section".to_string(),
                correlation_id: ctx.correlation_id.clone(),
                attachment_id: None,
            };
            let draft_value = ctx.gateway.generate(&prompt, &options)?;
            let draft: SectionDraft = serde_json::from_value(draft_value).map_err(|err| StageError::MalformedResponse {
                schema: "scaffold-section".to_string(),
                detail: err.to_string(),
            })?;

            sections.push(Section {
                id: Section::make_id(sequence + 1),
                title,
                beat_ids,
                body_with_markers: draft.body_with_markers,
                entry_transition: draft.entry_transition,
                exit_transition: draft.exit_transition,
                concept_sequence: draft.concept_sequence,
            });
        }

        let content_hash = readerforge_canon::hash_canonical_json(&sections)?;
        let envelope = Envelope::new(Producer::Scaffold, ctx.correlation_id.clone(), content_hash, Utc::now());
        Ok(Scaffold { envelope, sections })
    }
}

fn prompt_for(chapter_title: &str, section_title: &str, beats: &[readerforge_types::Beat]) -> String {
    let headlines: Vec<&str> = beats.iter().map(|beat| beat.headline.as_str()).collect();
    format!(
        "Write the entry transition, exit transition, and body prose (with \
         {{{{type:name}}}} asset placement markers) for the section \"{section_title}\" \
         of the chapter \"{chapter_title}\", covering beats: {}.",
        headlines.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_beat_headline() {
        let beats = vec![
            readerforge_types::Beat {
                id: "b1".into(),
                headline: "Newton's first law".into(),
                learning_outcomes: vec![],
                prereq_ids: vec![],
                suggested_asset_tokens: vec![],
            },
            readerforge_types::Beat {
                id: "b2".into(),
                headline: "Newton's second law".into(),
                learning_outcomes: vec![],
                prereq_ids: vec![],
                suggested_asset_tokens: vec![],
            },
        ];
        let prompt = prompt_for("Laws of Motion", "Getting started", &beats);
        assert!(prompt.contains("Newton's first law"));
        assert!(prompt.contains("Newton's second law"));
    }
}
