//! A deterministic [`GenerationBackend`] that never leaves the process —
//! used by integration tests and by `readerforge doctor`/dry-run paths that
//! need a full pipeline run without a reachable provider.
//!
//! Responses are derived from `options.schema` and `options.attachment_id`
//! so that repeated calls with the same inputs produce byte-identical
//! structured output, which keeps cache-hit and idempotency tests stable.

use async_trait::async_trait;

use crate::types::{GenerationBackend, GenerationOptions, GenerationResponse, LlmError};

pub struct StubBackend;

impl StubBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn invoke(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LlmError> {
        let slug = options
            .attachment_id
            .clone()
            .unwrap_or_else(|| "stub".to_string());

        let structured = structured_for(&options.schema, &slug, prompt);
        let raw_text = structured.to_string();

        Ok(GenerationResponse {
            structured: Some(structured),
            raw_text,
        })
    }
}

fn structured_for(schema: &str, slug: &str, prompt: &str) -> serde_json::Value {
    match schema {
        "plan" => plan_draft(slug),
        "scaffold-section" => scaffold_draft(slug),
        "section-prose" => prose_draft(slug, prompt),
        "section-eq" => equation_draft(slug),
        "section-plot" => plot_draft(slug),
        "section-diagram" => diagram_draft(slug),
        "section-chem" => chemistry_draft(slug),
        "section-widget" => widget_draft(slug),
        other => serde_json::json!({ "schema": other, "slug": slug }),
    }
}

fn plan_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "title": format!("Chapter: {slug}"),
        "beats": [
            {
                "id": "beat-1",
                "headline": "Introducing the core idea",
                "learning_outcomes": ["state the core idea in one sentence"],
                "prereq_ids": [],
                "suggested_asset_tokens": []
            },
            {
                "id": "beat-2",
                "headline": "Applying the core idea",
                "learning_outcomes": ["apply the core idea to a worked example"],
                "prereq_ids": ["beat-1"],
                "suggested_asset_tokens": ["eq:worked-example"]
            }
        ]
    })
}

fn scaffold_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "body_with_markers": format!(
            "We begin with {slug}. {{{{eq:worked-example}}}} follows directly from the setup."
        ),
        "entry_transition": format!("Picking up from the previous section, we turn to {slug}."),
        "exit_transition": "With that established, the next section builds on it.",
        "concept_sequence": [slug.to_string()]
    })
}

fn prose_draft(slug: &str, prompt: &str) -> serde_json::Value {
    let sentence_count = 1 + (prompt.len() % 3);
    let mut markdown = String::new();
    for i in 0..sentence_count {
        markdown.push_str(&format!("This is stub prose sentence {i} about {slug}. "));
    }
    serde_json::json!({ "markdown": markdown.trim_end() })
}

fn equation_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "latex": format!("E_{{{slug}}} = m c^2"),
        "check": {
            "vars": { "m": 2.0, "c": 3.0 },
            "expr": "m * c^2",
            "expected": 18.0,
            "tolerance": 0.001
        },
        "result_symbol": "E",
        "units": { "E": "kg*m^2/s^2", "m": "kg", "c": "m/s" }
    })
}

fn plot_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "name": slug,
            "expression": "sin(x)",
            "x_range": [0.0, 6.28],
            "y_range": [-1.0, 1.0],
            "sample_count": 64,
            "style": {
                "stroke_color": "#1f2937",
                "stroke_width": 2.0,
                "fill": serde_json::Value::Null,
                "grid": true
            },
            "content_hash": serde_json::Value::Null
        }
    })
}

fn diagram_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "name": slug,
            "grid_size": 10.0,
            "nodes": [
                { "id": "a", "x": 0.0, "y": 0.0, "label": "A" },
                { "id": "b", "x": 10.0, "y": 0.0, "label": "B" }
            ],
            "arrows": [
                { "from": "a", "to": "b", "label": serde_json::Value::Null }
            ],
            "required_node_ids": ["a", "b"],
            "content_hash": serde_json::Value::Null
        }
    })
}

fn chemistry_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "smiles": "CCO",
        "spec": {
            "name": slug,
            "smiles": "CCO",
            "caption": serde_json::Value::Null,
            "content_hash": serde_json::Value::Null
        }
    })
}

fn widget_draft(slug: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "name": slug,
            "widget_type": "range",
            "config": {},
            "content_hash": serde_json::Value::Null
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use readerforge_types::CorrelationId;

    fn options(schema: &str) -> GenerationOptions {
        GenerationOptions {
            schema: schema.to_string(),
            correlation_id: CorrelationId("corr-1".to_string()),
            attachment_id: Some("demo".to_string()),
        }
    }

    #[tokio::test]
    async fn returns_a_plan_matching_the_plan_draft_shape() {
        let backend = StubBackend::new();
        let response = backend.invoke("prompt", &options("plan")).await.unwrap();
        let structured = response.structured.unwrap();
        assert!(structured["title"].is_string());
        assert!(structured["beats"].as_array().unwrap().len() >= 1);
    }

    #[tokio::test]
    async fn same_inputs_produce_identical_output() {
        let backend = StubBackend::new();
        let a = backend.invoke("p", &options("section-eq")).await.unwrap();
        let b = backend.invoke("p", &options("section-eq")).await.unwrap();
        assert_eq!(a.raw_text, b.raw_text);
    }

    #[tokio::test]
    async fn unknown_schema_still_returns_structured_json_rather_than_erroring() {
        let backend = StubBackend::new();
        let response = backend.invoke("p", &options("mystery")).await.unwrap();
        assert!(response.structured.is_some());
    }
}
