//! The pipeline's finite state machine (spec.md §4.11): eight states,
//! strictly forward transitions, `COMPLETED`/`FAILED` absorbing.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineState {
    Accepted,
    Planning,
    Scaffolding,
    Sections,
    Assembling,
    Publishing,
    Completed,
    Failed,
}

impl PipelineState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Planning => "PLANNING",
            Self::Scaffolding => "SCAFFOLDING",
            Self::Sections => "SECTIONS",
            Self::Assembling => "ASSEMBLING",
            Self::Publishing => "PUBLISHING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Legal next states from this state. `Failed` is reachable from every
    /// non-terminal state (fail-fast policy, spec.md §4.11); `Completed`
    /// and `Failed` have no outgoing edges.
    fn legal_next(self) -> &'static [Self] {
        match self {
            Self::Accepted => &[Self::Planning, Self::Failed],
            Self::Planning => &[Self::Scaffolding, Self::Failed],
            Self::Scaffolding => &[Self::Sections, Self::Failed],
            Self::Sections => &[Self::Assembling, Self::Failed],
            Self::Assembling => &[Self::Publishing, Self::Failed],
            Self::Publishing => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("illegal pipeline transition {from} -> {to}")]
pub struct FsmError {
    pub from: &'static str,
    pub to: &'static str,
}

/// A `PipelineState` that can only move forward. `transition` is the sole
/// mutator; there is no way to reach a state outside the adjacency table.
#[derive(Debug, Clone, Copy)]
pub struct PipelineFsm {
    state: PipelineState,
}

impl Default for PipelineFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineFsm {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PipelineState::Accepted,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    pub fn transition(&mut self, next: PipelineState) -> Result<(), FsmError> {
        if !self.state.legal_next().contains(&next) {
            return Err(FsmError {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Force the terminal `Failed` state from wherever the FSM currently
    /// sits, short-circuiting any in-progress stage (fail-fast policy).
    pub fn fail(&mut self) {
        if !matches!(self.state, PipelineState::Completed | PipelineState::Failed) {
            self.state = PipelineState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_every_state_in_order() {
        let mut fsm = PipelineFsm::new();
        for next in [
            PipelineState::Planning,
            PipelineState::Scaffolding,
            PipelineState::Sections,
            PipelineState::Assembling,
            PipelineState::Publishing,
            PipelineState::Completed,
        ] {
            fsm.transition(next).unwrap();
        }
        assert_eq!(fsm.state(), PipelineState::Completed);
    }

    #[test]
    fn rejects_skipping_a_state() {
        let mut fsm = PipelineFsm::new();
        let err = fsm.transition(PipelineState::Sections).unwrap_err();
        assert_eq!(err.from, "ACCEPTED");
        assert_eq!(err.to, "SECTIONS");
    }

    #[test]
    fn rejects_backward_transition() {
        let mut fsm = PipelineFsm::new();
        fsm.transition(PipelineState::Planning).unwrap();
        fsm.transition(PipelineState::Scaffolding).unwrap();
        assert!(fsm.transition(PipelineState::Planning).is_err());
    }

    #[test]
    fn completed_and_failed_are_absorbing() {
        let mut fsm = PipelineFsm::new();
        fsm.transition(PipelineState::Failed).unwrap();
        assert!(fsm.transition(PipelineState::Planning).is_err());
        assert!(fsm.transition(PipelineState::Completed).is_err());
    }

    #[test]
    fn fail_is_a_noop_once_terminal() {
        let mut fsm = PipelineFsm::new();
        fsm.transition(PipelineState::Planning).unwrap();
        fsm.transition(PipelineState::Scaffolding).unwrap();
        fsm.transition(PipelineState::Sections).unwrap();
        fsm.transition(PipelineState::Assembling).unwrap();
        fsm.transition(PipelineState::Publishing).unwrap();
        fsm.transition(PipelineState::Completed).unwrap();
        fsm.fail();
        assert_eq!(fsm.state(), PipelineState::Completed);
    }
}
