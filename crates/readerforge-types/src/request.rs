//! The Submit request shape (spec.md §6).

use serde::{Deserialize, Serialize};

/// The three subjects readerforge knows how to author chapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Physics,
    Chemistry,
    Mathematics,
}

impl Subject {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physics => "Physics",
            Self::Chemistry => "Chemistry",
            Self::Mathematics => "Mathematics",
        }
    }
}

/// Difficulty tier; drives M2's beat-per-section grouping factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Comfort,
    Hustle,
    Advanced,
}

impl Difficulty {
    /// Beats grouped per section (spec.md §4.10, M2).
    #[must_use]
    pub const fn beats_per_section(self) -> usize {
        match self {
            Self::Comfort | Self::Hustle => 3,
            Self::Advanced => 2,
        }
    }
}

/// The compact authoring request that kicks off the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRequest {
    pub grade: String,
    pub subject: Subject,
    pub chapter: String,
    pub standard: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_grouping_factor_matches_spec() {
        assert_eq!(Difficulty::Comfort.beats_per_section(), 3);
        assert_eq!(Difficulty::Hustle.beats_per_section(), 3);
        assert_eq!(Difficulty::Advanced.beats_per_section(), 2);
    }
}
