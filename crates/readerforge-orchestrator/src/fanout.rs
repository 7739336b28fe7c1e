//! Section fan-out/fan-in (spec.md §4.11): a fixed-width worker pool drains
//! a bounded job queue, each worker running `SectionStage` independently;
//! results land in a pre-sized slot array indexed by Scaffold order, so
//! M4 always sees sections in their declared order regardless of which
//! worker finished first.

use readerforge_phases::{Stage, StageContext, StageError};
use readerforge_types::SectionContext;

/// One unit of M3 work: the section's index in Scaffold order (the fan-in
/// key) plus its input.
struct SectionJob {
    index: usize,
    context: SectionContext,
}

/// Run every section's M3 stage across a bounded worker pool of `width`
/// threads, returning results in Scaffold order. The first section
/// failure is recorded but does not stop workers already in flight; only
/// after every job has drained is the first error (if any) surfaced, so a
/// slow failing section never starves faster sections of their slot.
pub fn run_sections(
    ctx: &StageContext<'_>,
    stage: &(impl Stage<Input = SectionContext, Output = readerforge_types::SectionDoc> + Sync),
    sections: Vec<SectionContext>,
    width: usize,
) -> Result<Vec<readerforge_types::SectionDoc>, StageError> {
    let total = sections.len();
    let width = width.max(1).min(total.max(1));
    let (job_tx, job_rx) = crossbeam_channel::bounded::<SectionJob>(total.max(1));
    let (result_tx, result_rx) = crossbeam_channel::bounded::<(usize, Result<readerforge_types::SectionDoc, StageError>)>(total.max(1));

    for (index, context) in sections.into_iter().enumerate() {
        job_tx
            .send(SectionJob { index, context })
            .expect("queue sized to hold every section job");
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..width {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(|| {
                while let Ok(job) = job_rx.recv() {
                    let outcome = stage.run(ctx, job.context);
                    if result_tx.send((job.index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut slots: Vec<Option<readerforge_types::SectionDoc>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<StageError> = None;
        for (index, outcome) in result_rx {
            match outcome {
                Ok(doc) => slots[index] = Some(doc),
                Err(err) => {
                    tracing::warn!(section_index = index, error = %err, "section stage failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, doc)| doc.unwrap_or_else(|| panic!("section {index} produced neither a result nor an error")))
            .collect())
    })
}
