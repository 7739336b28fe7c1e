//! The four content-generation stages (spec.md §4.10): Plan, Scaffold,
//! Section, and Assemble, unified behind a shared [`Stage`] contract that
//! generalizes the teacher's `Phase` trait.

pub mod m1_plan;
pub mod m2_scaffold;
pub mod m3_section;
pub mod m4_assemble;
pub mod reference;
pub mod stage;

pub use m1_plan::{PlanInput, PlanStage};
pub use m2_scaffold::ScaffoldStage;
pub use m3_section::SectionStage;
pub use m4_assemble::{AssembleInput, AssembleStage};
pub use reference::{resolve_reference, ReferenceDoc, FUZZY_MATCH_THRESHOLD, PARTIAL_KEYWORD_THRESHOLD};
pub use stage::{Stage, StageContext, StageError, StageId};
