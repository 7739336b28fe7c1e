//! G1 — schema: `instance` conforms to `schema`, strictly (additional
//! properties forbidden is the schema author's responsibility to declare;
//! this gate just enforces whatever the supplied schema says).

use crate::outcome::{GateError, GateOutcome};
use crate::registry::{Gate, GateInput};

pub struct SchemaGate;

impl Gate for SchemaGate {
    fn id(&self) -> &'static str {
        "g1"
    }

    fn validate(&self, input: &GateInput<'_>) -> GateOutcome {
        let GateInput::Schema { instance, schema } = input else {
            return GateOutcome::fail(GateError::WrongInputKind);
        };
        validate(instance, schema)
    }
}

#[must_use]
pub fn validate(instance: &serde_json::Value, schema: &serde_json::Value) -> GateOutcome {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(err) => {
            return GateOutcome::fail(GateError::SchemaViolation {
                pointer: "#".to_string(),
                detail: format!("schema itself does not compile: {err}"),
            });
        }
    };

    let errors: Vec<GateError> = validator
        .iter_errors(instance)
        .map(|err| GateError::SchemaViolation {
            pointer: err.instance_path.to_string(),
            detail: err.to_string(),
        })
        .collect();

    GateOutcome::fail_many(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" }, "age": { "type": "integer" } },
            "required": ["name", "age"],
            "additionalProperties": false,
        })
    }

    #[test]
    fn accepts_conforming_instance() {
        let outcome = validate(&json!({"name": "ada", "age": 36}), &schema());
        assert!(outcome.valid);
    }

    #[test]
    fn rejects_missing_required_property() {
        let outcome = validate(&json!({"name": "ada"}), &schema());
        assert!(!outcome.valid);
        assert!(!outcome.errors.is_empty());
    }

    #[test]
    fn rejects_additional_properties() {
        let outcome = validate(&json!({"name": "ada", "age": 36, "extra": true}), &schema());
        assert!(!outcome.valid);
    }
}
