//! M2 output: the scaffold (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// An ordered grouping of beats into a section with asset placement markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Zero-padded sequential id, e.g. `"001"`.
    pub id: String,
    pub title: String,
    pub beat_ids: Vec<String>,
    /// Raw prose with embedded `{{type:name}}` placement markers.
    pub body_with_markers: String,
    pub entry_transition: String,
    pub exit_transition: String,
    /// Ordered terms this section introduces, used to seed the next
    /// section's running state.
    pub concept_sequence: Vec<String>,
}

impl Section {
    /// Zero-pad a 1-based sequence number into a section id.
    #[must_use]
    pub fn make_id(sequence: usize) -> String {
        format!("{sequence:03}")
    }

    /// Extract the `{{type:name}}` markers embedded in `body_with_markers`,
    /// in the order they appear.
    #[must_use]
    pub fn asset_markers(&self) -> Vec<String> {
        let mut markers = Vec::new();
        let mut rest = self.body_with_markers.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            if let Some(end) = after.find("}}") {
                markers.push(after[..end].to_string());
                rest = &after[end + 2..];
            } else {
                break;
            }
        }
        markers
    }
}

/// M2's output: ordered sections spanning the plan's beats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaffold {
    pub envelope: Envelope,
    pub sections: Vec<Section>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_markers_in_order() {
        let section = Section {
            id: "001".into(),
            title: "t".into(),
            beat_ids: vec![],
            body_with_markers: "intro {{eq:newton_ii}} middle {{plot:velocity_time}} end".into(),
            entry_transition: String::new(),
            exit_transition: String::new(),
            concept_sequence: vec![],
        };
        assert_eq!(
            section.asset_markers(),
            vec!["eq:newton_ii".to_string(), "plot:velocity_time".to_string()]
        );
    }

    #[test]
    fn zero_pads_ids() {
        assert_eq!(Section::make_id(1), "001");
        assert_eq!(Section::make_id(23), "023");
    }
}
