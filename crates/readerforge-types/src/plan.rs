//! M1 output: the chapter plan (spec.md §3).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::envelope::Envelope;
use crate::request::{Difficulty, Subject};

/// The smallest unit of chapter plan: a single learning moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beat {
    pub id: String,
    pub headline: String,
    pub learning_outcomes: Vec<String>,
    /// Ids of beats that must be understood first. Referenced ids must
    /// precede this beat in the plan's beat sequence (G2's DAG invariant).
    pub prereq_ids: Vec<String>,
    /// Tokens of the form `type:name`, validated against the G2 grammar.
    pub suggested_asset_tokens: Vec<String>,
}

/// M1's output: chapter metadata plus an ordered, acyclic sequence of beats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub envelope: Envelope,
    pub title: String,
    pub subject: Subject,
    pub grade: String,
    pub difficulty: Difficulty,
    pub beats: Vec<Beat>,
}

/// Error returned when a plan's beat graph violates the DAG invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BeatGraphError {
    #[error("beat '{0}' references unknown prereq '{1}'")]
    UnknownPrereq(String, String),
    #[error("beat '{0}' references a prereq '{1}' that does not precede it")]
    ForwardReference(String, String),
    #[error("beat graph contains a cycle reachable from '{0}'")]
    Cycle(String),
    #[error("duplicate beat id '{0}'")]
    DuplicateId(String),
}

impl Plan {
    /// Verify the prereq graph is a DAG referencing only preceding beat ids
    /// (spec.md §3 invariant; also exercised as gate G2).
    pub fn validate_beat_graph(&self) -> Result<(), BeatGraphError> {
        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (idx, beat) in self.beats.iter().enumerate() {
            if !seen_ids.insert(beat.id.as_str()) {
                return Err(BeatGraphError::DuplicateId(beat.id.clone()));
            }
            index_of.insert(beat.id.as_str(), idx);
        }

        for (idx, beat) in self.beats.iter().enumerate() {
            for prereq in &beat.prereq_ids {
                match index_of.get(prereq.as_str()) {
                    None => {
                        return Err(BeatGraphError::UnknownPrereq(
                            beat.id.clone(),
                            prereq.clone(),
                        ));
                    }
                    Some(&prereq_idx) if prereq_idx >= idx => {
                        return Err(BeatGraphError::ForwardReference(
                            beat.id.clone(),
                            prereq.clone(),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        // Since every prereq index is strictly less than its referencing
        // beat's index, the induced graph is acyclic by construction of the
        // ordering check above; a DFS color-mark pass still runs as a
        // defense-in-depth acyclicity proof for gate G2.
        self.dfs_acyclic_check()
    }

    fn dfs_acyclic_check(&self) -> Result<(), BeatGraphError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let by_id: HashMap<&str, &Beat> =
            self.beats.iter().map(|b| (b.id.as_str(), b)).collect();
        let mut colors: HashMap<&str, Color> =
            self.beats.iter().map(|b| (b.id.as_str(), Color::White)).collect();

        fn visit<'a>(
            id: &'a str,
            by_id: &HashMap<&'a str, &'a Beat>,
            colors: &mut HashMap<&'a str, Color>,
        ) -> Result<(), BeatGraphError> {
            colors.insert(id, Color::Gray);
            if let Some(beat) = by_id.get(id) {
                for prereq in &beat.prereq_ids {
                    match colors.get(prereq.as_str()).copied() {
                        Some(Color::Gray) => return Err(BeatGraphError::Cycle(id.to_string())),
                        Some(Color::White) | None => {
                            visit(prereq.as_str(), by_id, colors)?;
                        }
                        Some(Color::Black) => {}
                    }
                }
            }
            colors.insert(id, Color::Black);
            Ok(())
        }

        for beat in &self.beats {
            if colors.get(beat.id.as_str()).copied() == Some(Color::White) {
                visit(beat.id.as_str(), &by_id, &mut colors)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Producer;
    use crate::ids::{ContentHash, CorrelationId};
    use chrono::Utc;

    fn envelope() -> Envelope {
        Envelope::new(
            Producer::Plan,
            CorrelationId("corr-1".into()),
            ContentHash::from_hex(&"a".repeat(64)),
            Utc::now(),
        )
    }

    fn beat(id: &str, prereqs: &[&str]) -> Beat {
        Beat {
            id: id.to_string(),
            headline: format!("headline-{id}"),
            learning_outcomes: vec!["outcome".to_string()],
            prereq_ids: prereqs.iter().map(|s| s.to_string()).collect(),
            suggested_asset_tokens: vec![],
        }
    }

    #[test]
    fn accepts_valid_dag() {
        let plan = Plan {
            envelope: envelope(),
            title: "t".into(),
            subject: Subject::Physics,
            grade: "XI".into(),
            difficulty: Difficulty::Comfort,
            beats: vec![beat("b1", &[]), beat("b2", &["b1"]), beat("b3", &["b1", "b2"])],
        };
        assert!(plan.validate_beat_graph().is_ok());
    }

    #[test]
    fn rejects_forward_reference() {
        let plan = Plan {
            envelope: envelope(),
            title: "t".into(),
            subject: Subject::Physics,
            grade: "XI".into(),
            difficulty: Difficulty::Comfort,
            beats: vec![beat("b1", &["b2"]), beat("b2", &[])],
        };
        assert_eq!(
            plan.validate_beat_graph(),
            Err(BeatGraphError::ForwardReference("b1".into(), "b2".into()))
        );
    }

    #[test]
    fn rejects_unknown_prereq() {
        let plan = Plan {
            envelope: envelope(),
            title: "t".into(),
            subject: Subject::Physics,
            grade: "XI".into(),
            difficulty: Difficulty::Comfort,
            beats: vec![beat("b1", &["ghost"])],
        };
        assert_eq!(
            plan.validate_beat_graph(),
            Err(BeatGraphError::UnknownPrereq("b1".into(), "ghost".into()))
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let plan = Plan {
            envelope: envelope(),
            title: "t".into(),
            subject: Subject::Physics,
            grade: "XI".into(),
            difficulty: Difficulty::Comfort,
            beats: vec![beat("b1", &[]), beat("b1", &[])],
        };
        assert_eq!(
            plan.validate_beat_graph(),
            Err(BeatGraphError::DuplicateId("b1".into()))
        );
    }
}
