//! M4 output: the assembled reader document (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::request::{Difficulty, Subject};
use crate::section::ContentBlock;

/// Chapter-level metadata carried through to the final document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderDocMeta {
    pub title: String,
    pub subject: Subject,
    pub grade: String,
    pub chapter: String,
    pub standard: String,
    pub difficulty: Difficulty,
    pub section_titles: Vec<String>,
}

/// M4's output: chapter metadata plus a single flattened, globally
/// reindexed sequence of content blocks across every section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderDoc {
    pub envelope: Envelope,
    pub meta: ReaderDocMeta,
    pub blocks: Vec<ContentBlock>,
}

impl ReaderDoc {
    /// Build the globally unique id for a block at position `index` (0-based)
    /// within `section_id`, following the `chapter-slug/section-id/block-kind-nn`
    /// scheme.
    #[must_use]
    pub fn global_block_id(chapter_slug: &str, section_id: &str, kind: &str, index: usize) -> String {
        format!("{chapter_slug}/{section_id}/{kind}-{index:02}")
    }

    /// Reassign every block's id to the global scheme, preserving order.
    /// Each block kind is numbered independently within its section.
    pub fn reindex_blocks(&mut self, chapter_slug: &str) {
        use std::collections::HashMap;

        let mut per_section_kind_counter: HashMap<(String, &'static str), usize> = HashMap::new();
        for block in &mut self.blocks {
            let section_id = section_id_from_block_id(block.id());
            let kind = block_kind_str(block);
            let counter = per_section_kind_counter
                .entry((section_id.clone(), kind))
                .or_insert(0);
            let new_id = Self::global_block_id(chapter_slug, &section_id, kind, *counter);
            *counter += 1;
            block.set_id(new_id);
        }
    }

    /// Verify that every block id in the document is unique, as required
    /// before publishing (spec.md §4.11, M4 assembly invariant).
    #[must_use]
    pub fn has_unique_block_ids(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.blocks.iter().all(|b| seen.insert(b.id()))
    }
}

fn block_kind_str(block: &ContentBlock) -> &'static str {
    match block {
        ContentBlock::Prose { .. } => "prose",
        ContentBlock::Equation { .. } => "eq",
        ContentBlock::Plot { .. } => "plot",
        ContentBlock::Diagram { .. } => "diagram",
        ContentBlock::Chemistry { .. } => "chem",
        ContentBlock::Widget { .. } => "widget",
    }
}

/// Before reindexing, block ids are still section-scoped
/// (e.g. `"001-block-03"`); take the section-id prefix for grouping.
fn section_id_from_block_id(id: &str) -> String {
    id.split('-').next().unwrap_or(id).to_string()
}
