//! G7 — diagram topology: node ids unique, arrows reference existing
//! endpoints, required nodes present, and grid-snap invariants hold after
//! snapping every node's coordinates to the declared grid.

use std::collections::HashSet;

use readerforge_types::DiagramSpec;

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

pub struct DiagramGate;

impl Gate for DiagramGate {
    fn id(&self) -> &'static str {
        "g7"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Diagram { spec } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(spec)
    }
}

#[must_use]
pub fn validate(spec: &DiagramSpec) -> GateOutcome {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for node in &spec.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            errors.push(GateError::DiagramTopology(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
    }

    for arrow in &spec.arrows {
        if !seen_ids.contains(arrow.from.as_str()) {
            errors.push(GateError::DiagramTopology(format!(
                "arrow references unknown source node '{}'",
                arrow.from
            )));
        }
        if !seen_ids.contains(arrow.to.as_str()) {
            errors.push(GateError::DiagramTopology(format!(
                "arrow references unknown target node '{}'",
                arrow.to
            )));
        }
    }

    for required in &spec.required_node_ids {
        if !seen_ids.contains(required.as_str()) {
            errors.push(GateError::DiagramTopology(format!(
                "required node '{required}' is missing"
            )));
        }
    }

    if spec.grid_size <= 0.0 {
        errors.push(GateError::DiagramTopology(
            "grid_size must be strictly positive".to_string(),
        ));
    } else {
        for node in &spec.nodes {
            if !is_grid_aligned(node.x, spec.grid_size) || !is_grid_aligned(node.y, spec.grid_size)
            {
                errors.push(GateError::DiagramTopology(format!(
                    "node '{}' at ({}, {}) does not snap cleanly to grid size {}",
                    node.id, node.x, node.y, spec.grid_size
                )));
            }
        }
    }

    GateOutcome::fail_many(errors)
}

/// A coordinate snaps cleanly if rounding it to the nearest grid multiple
/// moves it by no more than half a floating-point epsilon scaled to the
/// grid size — i.e. it was already produced by snapping.
fn is_grid_aligned(value: f64, grid_size: f64) -> bool {
    let snapped = (value / grid_size).round() * grid_size;
    (snapped - value).abs() <= grid_size * 1e-9
}
