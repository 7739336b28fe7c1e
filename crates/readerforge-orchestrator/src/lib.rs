//! The pipeline orchestrator (spec.md §4.11): drives a single request
//! through the FSM in [`fsm`], fanning M3 section work out across a worker
//! pool in [`fanout`] and sequencing the whole run in [`pipeline`].

mod fanout;
mod fsm;
mod pipeline;

pub use fanout::run_sections;
pub use fsm::{FsmError, PipelineFsm, PipelineState};
pub use pipeline::{correlation_id_for, Pipeline, PipelineConfig, PipelineError, PipelineStats};
