//! Core data model for the readerforge content-generation pipeline.
//!
//! Every inter-stage artifact is a plain, serializable Rust type. Tagged
//! unions carry an explicit discriminant field (`#[serde(tag = "kind")]`)
//! rather than relying on any runtime type inspection, matching how the
//! pipeline's stages hand typed, versioned messages to one another.

pub mod asset;
pub mod compat;
pub mod envelope;
pub mod ids;
pub mod plan;
pub mod reader_doc;
pub mod request;
pub mod scaffold;
pub mod section;

pub use asset::{AssetKind, AssetSpec, ChemistrySpec, DiagramSpec, PlotSpec, WidgetSpec};
pub use envelope::{Envelope, Producer};
pub use ids::{ContentHash, CorrelationId, PromptId};
pub use plan::{Beat, Plan};
pub use reader_doc::{ReaderDoc, ReaderDocMeta};
pub use request::{ChapterRequest, Difficulty, Subject};
pub use scaffold::{Scaffold, Section as ScaffoldSection};
pub use section::{
    ContentBlock, GateRunRecord, NumericCheck, RepairLogEntry, RunningState, SectionContext,
    SectionDoc, ValidationReport,
};
