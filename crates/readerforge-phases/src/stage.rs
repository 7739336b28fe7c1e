//! The shared stage contract every `M1..M4` module implements, generalizing
//! the teacher's `Phase` trait (`id`, `deps`, a single typed transform) to
//! readerforge's four-stage pipeline.

use readerforge_gate::GateRegistry;
use readerforge_llm::LlmGateway;
use readerforge_repair::RepairEngine;
use readerforge_types::CorrelationId;

/// Identifies which of the four stage modules produced or consumes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Plan,
    Scaffold,
    Section,
    Assemble,
}

impl StageId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "m1-plan",
            Self::Scaffold => "m2-scaffold",
            Self::Section => "m3-section",
            Self::Assemble => "m4-assemble",
        }
    }

    /// The stages that must complete before this one can run, mirroring
    /// the teacher's `Phase::deps`.
    #[must_use]
    pub const fn deps(self) -> &'static [StageId] {
        match self {
            Self::Plan => &[],
            Self::Scaffold => &[StageId::Plan],
            Self::Section => &[StageId::Scaffold],
            Self::Assemble => &[StageId::Section],
        }
    }
}

/// Everything a stage needs to call out to the rest of the pipeline:
/// the LLM gateway, the gate registry, the repair engine, and the
/// correlation id every log line and artifact carries.
pub struct StageContext<'a> {
    pub correlation_id: CorrelationId,
    pub gateway: &'a LlmGateway,
    pub gates: &'a GateRegistry,
    pub repair: &'a RepairEngine,
}

impl<'a> StageContext<'a> {
    #[must_use]
    pub fn new(
        correlation_id: CorrelationId,
        gateway: &'a LlmGateway,
        gates: &'a GateRegistry,
        repair: &'a RepairEngine,
    ) -> Self {
        Self {
            correlation_id,
            gateway,
            gates,
            repair,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("LLM gateway call failed: {0}")]
    Llm(#[from] readerforge_llm::GatewayError),

    #[error("response for {schema} could not be parsed into the expected shape: {detail}")]
    MalformedResponse { schema: String, detail: String },

    #[error("gate {gate_id} rejected the generated artifact: {detail}")]
    GateFailed { gate_id: String, detail: String },

    #[error("repair engine could not recover {kind}: {0}")]
    RepairExhausted(String, #[source] readerforge_repair::RepairError),

    #[error("content hashing failed: {0}")]
    Canon(#[from] anyhow::Error),
}

/// A single M1..M4 transform: some input artifact in, a validated artifact
/// out. Each stage module implements this once over its own concrete
/// `Input`/`Output` pair rather than forcing a shared supertype on the
/// data model.
pub trait Stage {
    type Input;
    type Output;

    fn id(&self) -> StageId;

    fn run(&self, ctx: &StageContext<'_>, input: Self::Input) -> Result<Self::Output, StageError>;
}
