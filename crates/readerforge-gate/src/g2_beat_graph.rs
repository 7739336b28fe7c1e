//! G2 — beat graph: prereq references resolve and the induced graph is
//! acyclic (delegated to `Plan::validate_beat_graph`'s DFS color-mark
//! pass), and every suggested asset token matches the `type:name` grammar.

use readerforge_types::{AssetKind, Plan};

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

pub struct BeatGraphGate;

impl Gate for BeatGraphGate {
    fn id(&self) -> &'static str {
        "g2"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::BeatGraph { plan } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(plan)
    }
}

#[must_use]
pub fn validate(plan: &Plan) -> GateOutcome {
    let mut errors = Vec::new();

    if let Err(err) = plan.validate_beat_graph() {
        errors.push(GateError::BeatGraph {
            beat_id: beat_id_from(&err),
            detail: err.to_string(),
        });
    }

    for beat in &plan.beats {
        for token in &beat.suggested_asset_tokens {
            if AssetKind::parse_token(token).is_none() {
                errors.push(GateError::MalformedAssetToken {
                    token: token.clone(),
                });
            }
        }
    }

    GateOutcome::fail_many(errors)
}

fn beat_id_from(err: &readerforge_types::plan::BeatGraphError) -> String {
    use readerforge_types::plan::BeatGraphError as E;
    match err {
        E::UnknownPrereq(id, _)
        | E::ForwardReference(id, _)
        | E::Cycle(id)
        | E::DuplicateId(id) => id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use readerforge_types::{Beat, Difficulty, Envelope, Subject};
    use readerforge_types::envelope::Producer;
    use readerforge_types::{ContentHash, CorrelationId};

    fn plan(beats: Vec<Beat>) -> Plan {
        Plan {
            envelope: Envelope::new(
                Producer::Plan,
                CorrelationId("corr-1".into()),
                ContentHash::from_hex(&"a".repeat(64)),
                Utc::now(),
            ),
            title: "t".into(),
            subject: Subject::Physics,
            grade: "XI".into(),
            difficulty: Difficulty::Comfort,
            beats,
        }
    }

    fn beat(id: &str, tokens: &[&str]) -> Beat {
        Beat {
            id: id.to_string(),
            headline: "h".into(),
            learning_outcomes: vec!["o".into()],
            prereq_ids: vec![],
            suggested_asset_tokens: tokens.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn passes_a_well_formed_plan() {
        let outcome = validate(&plan(vec![beat("b1", &["eq:newton2"])]));
        assert!(outcome.valid);
    }

    #[test]
    fn rejects_malformed_asset_tokens() {
        let outcome = validate(&plan(vec![beat("b1", &["Eq:Newton"])]));
        assert!(!outcome.valid);
        assert!(matches!(
            outcome.errors[0],
            GateError::MalformedAssetToken { .. }
        ));
    }
}
