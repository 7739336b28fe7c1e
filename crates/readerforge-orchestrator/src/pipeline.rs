//! Drives a single request end-to-end through M1..M4, advancing
//! `PipelineFsm` as each stage completes and fanning section work out to
//! [`crate::fanout::run_sections`].

use std::cell::RefCell;
use std::time::Instant;

use readerforge_phases::{
    AssembleInput, AssembleStage, PlanInput, PlanStage, ReferenceDoc, ScaffoldStage, Stage,
    StageContext, StageError,
};
use readerforge_types::{
    ChapterRequest, CorrelationId, ReaderDoc, ReaderDocMeta, RunningState, Scaffold,
    SectionContext, SectionDoc,
};

use crate::fsm::{FsmError, PipelineFsm, PipelineState};

/// Wall-clock duration of one stage within the most recent `run`.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration_ms: u64,
}

/// Gate tallies and per-stage timings from the most recently completed
/// `run`, for run-level reporting alongside the gateway's own stats.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub gates_passed: u64,
    pub gates_failed: u64,
    pub stage_durations: Vec<StageTiming>,
}

impl PipelineStats {
    fn record_gates(&mut self, sections: &[SectionDoc]) {
        for record in sections.iter().flat_map(|s| &s.validation.gate_runs) {
            if record.passed {
                self.gates_passed += 1;
            } else {
                self.gates_failed += 1;
            }
        }
    }

    fn record_stage(&mut self, stage: &'static str, started: Instant) {
        self.stage_durations.push(StageTiming {
            stage,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("stage failed: {0}")]
    Stage(#[from] StageError),

    #[error("illegal FSM transition: {0}")]
    Fsm(#[from] FsmError),
}

/// Per-request tuning knobs the caller controls; everything else about a
/// run is derived from the request and the shared `StageContext`.
pub struct PipelineConfig {
    /// Worker pool width for the M3 fan-out (spec.md §4.11, "width equals
    /// the allowed per-request concurrency").
    pub section_concurrency: usize,
    pub reference_index: Vec<ReferenceDoc>,
}

/// Runs a single `ChapterRequest` through Plan, Scaffold, fanned-out
/// Section, and Assemble, surfacing the FSM state reached at the point of
/// failure (if any) alongside the error.
pub struct Pipeline<'a> {
    ctx: StageContext<'a>,
    config: PipelineConfig,
    stats: RefCell<PipelineStats>,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(ctx: StageContext<'a>, config: PipelineConfig) -> Self {
        Self {
            ctx,
            config,
            stats: RefCell::new(PipelineStats::default()),
        }
    }

    /// Gate tallies and stage timings from the most recently completed
    /// `run`. Reads as all-zero/empty before the first call.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.stats.borrow().clone()
    }

    pub fn run(&self, chapter_slug: &str, request: &ChapterRequest) -> Result<(PipelineFsm, ReaderDoc), PipelineError> {
        *self.stats.borrow_mut() = PipelineStats::default();
        let mut fsm = PipelineFsm::new();

        let run = self.run_stages(chapter_slug, request, &mut fsm);
        match run {
            Ok(doc) => Ok((fsm, doc)),
            Err(err) => {
                fsm.fail();
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        chapter_slug: &str,
        request: &ChapterRequest,
        fsm: &mut PipelineFsm,
    ) -> Result<ReaderDoc, PipelineError> {
        fsm.transition(PipelineState::Planning)?;
        let plan_started = Instant::now();
        let plan = PlanStage.run(
            &self.ctx,
            PlanInput {
                subject: request.subject,
                grade: request.grade.clone(),
                chapter: request.chapter.clone(),
                difficulty: request.difficulty,
                reference_index: self.config.reference_index.clone(),
            },
        )?;
        self.stats.borrow_mut().record_stage("m1-plan", plan_started);

        fsm.transition(PipelineState::Scaffolding)?;
        let plan_title = plan.title.clone();
        let scaffold_started = Instant::now();
        let scaffold = ScaffoldStage.run(&self.ctx, plan)?;
        self.stats.borrow_mut().record_stage("m2-scaffold", scaffold_started);

        fsm.transition(PipelineState::Sections)?;
        let section_titles: Vec<String> = scaffold.sections.iter().map(|s| s.title.clone()).collect();
        let sections_started = Instant::now();
        let section_docs = self.run_sections(&scaffold)?;
        {
            let mut stats = self.stats.borrow_mut();
            stats.record_stage("m3-section", sections_started);
            stats.record_gates(&section_docs);
        }

        fsm.transition(PipelineState::Assembling)?;
        let meta = ReaderDocMeta {
            title: plan_title,
            subject: request.subject,
            grade: request.grade.clone(),
            chapter: request.chapter.clone(),
            standard: request.standard.clone(),
            difficulty: request.difficulty,
            section_titles,
        };
        let assemble_started = Instant::now();
        let doc = AssembleStage.run(
            &self.ctx,
            AssembleInput {
                chapter_slug: chapter_slug.to_string(),
                meta,
                sections: section_docs,
            },
        )?;
        self.stats.borrow_mut().record_stage("m4-assemble", assemble_started);

        fsm.transition(PipelineState::Publishing)?;
        Ok(doc)
    }

    fn run_sections(&self, scaffold: &Scaffold) -> Result<Vec<SectionDoc>, StageError> {
        let mut running_state = RunningState::default();
        let mut contexts = Vec::with_capacity(scaffold.sections.len());
        for section in &scaffold.sections {
            contexts.push(SectionContext {
                section_id: section.id.clone(),
                title: section.title.clone(),
                beat_ids: section.beat_ids.clone(),
                body_with_markers: section.body_with_markers.clone(),
                entry_transition: section.entry_transition.clone(),
                exit_transition: section.exit_transition.clone(),
                running_state_in: running_state.clone(),
            });
            running_state.terms_introduced.extend(section.concept_sequence.clone());
        }

        crate::fanout::run_sections(&self.ctx, &readerforge_phases::SectionStage, contexts, self.config.section_concurrency)
    }
}

#[must_use]
pub fn correlation_id_for(request: &ChapterRequest, fallback: &str) -> CorrelationId {
    CorrelationId(request.correlation_id.clone().unwrap_or_else(|| fallback.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_prefers_request_value() {
        let mut request_with_id = sample_request();
        request_with_id.correlation_id = Some("explicit-corr".to_string());
        assert_eq!(correlation_id_for(&request_with_id, "fallback").0, "explicit-corr");

        let request_without_id = sample_request();
        assert_eq!(correlation_id_for(&request_without_id, "fallback").0, "fallback");
    }

    fn sample_request() -> ChapterRequest {
        ChapterRequest {
            grade: "XI".to_string(),
            subject: readerforge_types::Subject::Physics,
            chapter: "Laws of Motion".to_string(),
            standard: "NCERT".to_string(),
            difficulty: readerforge_types::Difficulty::Comfort,
            attachments: vec![],
            correlation_id: None,
        }
    }
}
