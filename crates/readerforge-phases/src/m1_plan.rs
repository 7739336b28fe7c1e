//! M1 (Plan): request in, chapter Plan out. Calls the LLM gateway with the
//! plan-schema hint, validates the draft with G1 (schema) and G2 (beat
//! graph), and repairs a schema violation once before giving up.

use std::collections::HashMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use readerforge_gate::GateInput;
use readerforge_llm::GenerationOptions;
use readerforge_repair::strategies::{self, RepairInput};
use readerforge_types::{Beat, Envelope, Plan, Producer};
use serde::Deserialize;

use crate::reference::{resolve_reference, ReferenceDoc};
use crate::stage::{Stage, StageContext, StageError, StageId};

/// The plan request handed to M1: the chapter request fields it needs plus
/// whatever reference corpus is available for `resolve_reference`.
pub struct PlanInput {
    pub subject: readerforge_types::Subject,
    pub grade: String,
    pub chapter: String,
    pub difficulty: readerforge_types::Difficulty,
    pub reference_index: Vec<ReferenceDoc>,
}

static PLAN_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "object",
        "required": ["title", "beats"],
        "properties": {
            "title": { "type": "string" },
            "beats": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "headline", "learning_outcomes", "prereq_ids", "suggested_asset_tokens"]
                }
            }
        }
    })
});

static PLAN_SCHEMA_DEFAULTS: Lazy<HashMap<String, serde_json::Value>> = Lazy::new(|| {
    [
        ("title".to_string(), serde_json::json!("Untitled chapter")),
        ("beats".to_string(), serde_json::json!([])),
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Deserialize)]
struct PlanDraft {
    title: String,
    beats: Vec<Beat>,
}

pub struct PlanStage;

impl Stage for PlanStage {
    type Input = PlanInput;
    type Output = Plan;

    fn id(&self) -> StageId {
        StageId::Plan
    }

    fn run(&self, ctx: &StageContext<'_>, input: Self::Input) -> Result<Plan, StageError> {
        let reference_key = format!("{}/{}", input.subject.as_str(), input.chapter);
        let attachment_id = resolve_reference(&reference_key, &input.reference_index)
            .map(|doc| doc.attachment_id.clone());

        let prompt = prompt_for(&input);
        let options = GenerationOptions {
            schema: "plan".to_string(),
            correlation_id: ctx.correlation_id.clone(),
            attachment_id,
        };

        let mut draft_value = ctx.gateway.generate(&prompt, &options)?;
        draft_value = validate_and_repair_schema(ctx, draft_value)?;

        let draft: PlanDraft = serde_json::from_value(draft_value).map_err(|err| StageError::MalformedResponse {
            schema: "plan".to_string(),
            detail: err.to_string(),
        })?;

        let plan_body = serde_json::json!({ "title": draft.title, "beats": draft.beats });
        let content_hash = readerforge_canon::hash_canonical_json(&plan_body)?;
        let envelope = Envelope::new(Producer::Plan, ctx.correlation_id.clone(), content_hash, Utc::now());

        let plan = Plan {
            envelope,
            title: draft.title,
            subject: input.subject,
            grade: input.grade,
            difficulty: input.difficulty,
            beats: draft.beats,
        };

        let beat_graph_outcome = ctx.gates.validate("g2", &GateInput::BeatGraph { plan: &plan }).expect("g2 is always registered");
        if !beat_graph_outcome.valid {
            return Err(StageError::GateFailed {
                gate_id: "g2".to_string(),
                detail: beat_graph_outcome
                    .errors
                    .first()
                    .map(std::string::ToString::to_string)
                    .unwrap_or_default(),
            });
        }

        Ok(plan)
    }
}

fn prompt_for(input: &PlanInput) -> String {
    format!(
        "Plan a {} chapter titled \"{}\" for grade {} at {} difficulty. \
         Produce an ordered sequence of beats, each with learning outcomes, \
         prereq ids referencing only earlier beats, and suggested asset \
         tokens of the form type:name.",
        input.subject.as_str(),
        input.chapter,
        input.grade,
        input.difficulty.beats_per_section(),
    )
}

/// Validate the draft against the plan schema (G1); if it fails, fill in
/// missing top-level fields with defaults via the repair engine and
/// re-validate once before giving up.
fn validate_and_repair_schema(
    ctx: &StageContext<'_>,
    instance: serde_json::Value,
) -> Result<serde_json::Value, StageError> {
    let outcome = ctx
        .gates
        .validate("g1", &GateInput::Schema { instance: &instance, schema: &PLAN_SCHEMA })
        .expect("g1 is always registered");
    if outcome.valid {
        return Ok(instance);
    }

    let attempt = ctx
        .repair
        .begin_attempt("m1", &ctx.correlation_id.0, "schema-missing-field")
        .map_err(|err| StageError::RepairExhausted("schema-missing-field".to_string(), err))?;

    let repaired = strategies::apply(
        RepairInput::SchemaMissingField {
            instance: &instance,
            defaults: &PLAN_SCHEMA_DEFAULTS,
        },
        attempt,
    );
    let strategies::Patched::Json(patched) = repaired.patched else {
        unreachable!("schema_missing_field always returns Patched::Json");
    };

    let reoutcome = ctx
        .gates
        .validate("g1", &GateInput::Schema { instance: &patched, schema: &PLAN_SCHEMA })
        .expect("g1 is always registered");
    if reoutcome.valid {
        Ok(patched)
    } else {
        Err(StageError::GateFailed {
            gate_id: "g1".to_string(),
            detail: reoutcome
                .errors
                .first()
                .map(std::string::ToString::to_string)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_chapter_and_difficulty() {
        let input = PlanInput {
            subject: readerforge_types::Subject::Physics,
            grade: "XI".to_string(),
            chapter: "Laws of Motion".to_string(),
            difficulty: readerforge_types::Difficulty::Comfort,
            reference_index: Vec::new(),
        };
        let prompt = prompt_for(&input);
        assert!(prompt.contains("Laws of Motion"));
        assert!(prompt.contains("Physics"));
    }
}
