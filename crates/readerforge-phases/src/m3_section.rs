//! M3 (Section): one `SectionContext` in, one `SectionDoc` out. Issues an
//! LLM call per asset marker (falling back to a single prose call when a
//! section carries none), validates each generated block with the gate
//! relevant to its kind, and repairs a validation failure once before
//! failing the section.

use std::collections::HashMap;

use chrono::Utc;
use readerforge_gate::{GateError, GateInput};
use readerforge_llm::GenerationOptions;
use readerforge_repair::strategies::{self, Patched, RepairInput};
use readerforge_types::{
    AssetKind, AssetSpec, ChemistrySpec, ContentBlock, ContentHash, DiagramSpec, Envelope,
    GateRunRecord, NumericCheck, PlotSpec, Producer, SectionContext, SectionDoc, ValidationReport,
    WidgetSpec,
};
use serde::Deserialize;

use crate::stage::{Stage, StageContext, StageError, StageId};

pub struct SectionStage;

impl Stage for SectionStage {
    type Input = SectionContext;
    type Output = SectionDoc;

    fn id(&self) -> StageId {
        StageId::Section
    }

    fn run(&self, ctx: &StageContext<'_>, section: SectionContext) -> Result<SectionDoc, StageError> {
        let markers = asset_markers(&section.body_with_markers);
        let mut blocks = Vec::new();
        let mut report = ValidationReport::default();
        let mut running_state = section.running_state_in.clone();

        if markers.is_empty() {
            let block = generate_prose_block(ctx, &section, &mut report, 0)?;
            blocks.push(block);
        } else {
            for (index, marker) in markers.iter().enumerate() {
                let Some((kind, name)) = AssetKind::parse_token(marker) else {
                    return Err(StageError::MalformedResponse {
                        schema: "asset-marker".to_string(),
                        detail: format!("marker '{marker}' does not match the type:name grammar"),
                    });
                };
                let block = generate_asset_block(ctx, &section, kind, &name, &mut report, index)?;
                blocks.push(block);
            }
        }

        running_state.asset_hashes_used.extend(blocks.iter().filter_map(asset_content_hash));
        running_state.open_threads.push(section.exit_transition.clone());
        running_state.set_recap(&section.exit_transition);

        let content_hash = readerforge_canon::hash_canonical_json(&blocks)?;
        let envelope = Envelope::new(Producer::Section, ctx.correlation_id.clone(), content_hash, Utc::now());

        Ok(SectionDoc {
            envelope,
            section_id: section.section_id,
            blocks,
            validation: report,
            running_state_out: running_state,
        })
    }
}

/// Extract the `{{type:name}}` markers embedded in `text`, in order.
/// Mirrors `readerforge_types::ScaffoldSection::asset_markers`, operating
/// on the raw text a `SectionContext` carries rather than a `Section`.
fn asset_markers(text: &str) -> Vec<String> {
    let mut markers = Vec::new();
    let mut rest = text;
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

/// The content hash carried by a block's asset spec, if it has one and the
/// spec has already been through the compiler (C12 fills this in later in
/// the pipeline; at M3 time it is typically still `None`).
fn asset_content_hash(block: &ContentBlock) -> Option<ContentHash> {
    match block.asset_spec()? {
        AssetSpec::Plot(spec) => spec.content_hash,
        AssetSpec::Diagram(spec) => spec.content_hash,
        AssetSpec::Chem(spec) => spec.content_hash,
        AssetSpec::Widget(spec) => spec.content_hash,
    }
}

fn block_id(section_id: &str, index: usize) -> String {
    format!("{section_id}-block-{index:02}")
}

#[derive(Debug, Deserialize)]
struct ProseDraft {
    markdown: String,
}

fn generate_prose_block(
    ctx: &StageContext<'_>,
    section: &SectionContext,
    report: &mut ValidationReport,
    index: usize,
) -> Result<ContentBlock, StageError> {
    let prompt = format!(
        "Continuing from: \"{}\". Write the prose for section \"{}\".",
        section.running_state_in.recap, section.title
    );
    let options = GenerationOptions {
        schema: "section-prose".to_string(),
        correlation_id: ctx.correlation_id.clone(),
        attachment_id: None,
    };
    let value = ctx.gateway.generate(&prompt, &options)?;
    let draft: ProseDraft = serde_json::from_value(value).map_err(|err| StageError::MalformedResponse {
        schema: "section-prose".to_string(),
        detail: err.to_string(),
    })?;

    let markdown = validate_style(ctx, draft.markdown, report)?;
    let word_count = markdown.split_whitespace().count();
    Ok(ContentBlock::Prose {
        id: block_id(&section.section_id, index),
        markdown,
        word_count,
    })
}

/// G12 (style) has no repair strategy in spec.md §4.9's enumerated list;
/// a violation fails the block outright rather than being patched.
fn validate_style(
    ctx: &StageContext<'_>,
    markdown: String,
    report: &mut ValidationReport,
) -> Result<String, StageError> {
    let outcome = ctx
        .gates
        .validate("g12", &GateInput::Style { markdown: &markdown })
        .expect("g12 is always registered");
    record(report, "g12", &outcome);
    if outcome.valid {
        Ok(markdown)
    } else {
        Err(StageError::GateFailed {
            gate_id: "g12".to_string(),
            detail: outcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EquationDraft {
    latex: String,
    check: NumericCheck,
    /// The symbol standing on the equation's left-hand side (e.g. `"F"` in
    /// `F = m * a`), looked up in `units` to get G11's left-hand dimension.
    result_symbol: String,
    /// Declared unit string per variable name appearing in `check.expr` or
    /// as `result_symbol`, feeding G11's dimensional-consistency check.
    units: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PlotDraft {
    spec: PlotSpec,
}

#[derive(Debug, Deserialize)]
struct DiagramDraft {
    spec: DiagramSpec,
}

#[derive(Debug, Deserialize)]
struct ChemistryDraft {
    smiles: String,
    spec: ChemistrySpec,
}

#[derive(Debug, Deserialize)]
struct WidgetDraft {
    spec: WidgetSpec,
}

fn generate_asset_block(
    ctx: &StageContext<'_>,
    section: &SectionContext,
    kind: AssetKind,
    name: &str,
    report: &mut ValidationReport,
    index: usize,
) -> Result<ContentBlock, StageError> {
    let prompt = format!(
        "Within section \"{}\", author the {} asset named \"{}\" along with the \
         prose sentence introducing it.",
        section.title,
        kind.as_str(),
        name
    );
    let schema = format!("section-{}", kind.as_str());
    let options = GenerationOptions {
        schema,
        correlation_id: ctx.correlation_id.clone(),
        attachment_id: None,
    };
    let value = ctx.gateway.generate(&prompt, &options)?;
    let id = block_id(&section.section_id, index);

    match kind {
        AssetKind::Eq => {
            let draft: EquationDraft = parse(value, "section-eq")?;
            let latex = validate_latex(ctx, draft.latex, report)?;
            let check = validate_numeric(ctx, draft.check, report)?;
            validate_units(ctx, &draft.result_symbol, &check.expr, &draft.units, report)?;
            Ok(ContentBlock::Equation { id, latex, check })
        }
        AssetKind::Plot => {
            let draft: PlotDraft = parse(value, "section-plot")?;
            validate_expression(ctx, &draft.spec.expression, report)?;
            Ok(ContentBlock::Plot { id, spec: draft.spec })
        }
        AssetKind::Diagram => {
            let draft: DiagramDraft = parse(value, "section-diagram")?;
            validate_diagram(ctx, &draft.spec, report)?;
            Ok(ContentBlock::Diagram { id, spec: draft.spec })
        }
        AssetKind::Chem => {
            let draft: ChemistryDraft = parse(value, "section-chem")?;
            let smiles = validate_smiles(ctx, draft.smiles, report)?;
            Ok(ContentBlock::Chemistry { id, smiles, spec: draft.spec })
        }
        AssetKind::Widget => {
            let draft: WidgetDraft = parse(value, "section-widget")?;
            Ok(ContentBlock::Widget { id, spec: draft.spec })
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value, schema: &str) -> Result<T, StageError> {
    serde_json::from_value(value).map_err(|err| StageError::MalformedResponse {
        schema: schema.to_string(),
        detail: err.to_string(),
    })
}

fn record(report: &mut ValidationReport, gate_id: &str, outcome: &readerforge_gate::GateOutcome) {
    report.gate_runs.push(GateRunRecord {
        gate_id: gate_id.to_string(),
        passed: outcome.valid,
        errors: outcome.errors.iter().map(std::string::ToString::to_string).collect(),
        warnings: outcome.warnings.clone(),
    });
    report.warnings.extend(outcome.warnings.iter().cloned());
}

fn validate_latex(ctx: &StageContext<'_>, latex: String, report: &mut ValidationReport) -> Result<String, StageError> {
    let outcome = ctx.gates.validate("g3", &GateInput::Latex { source: &latex }).expect("g3 is always registered");
    record(report, "g3", &outcome);
    if outcome.valid {
        return Ok(latex);
    }

    let kind = "latex-unbalanced";
    let attempt = ctx
        .repair
        .begin_attempt("m3", &ctx.correlation_id.0, kind)
        .map_err(|err| StageError::RepairExhausted(kind.to_string(), err))?;
    let repaired = strategies::apply(RepairInput::LatexUnbalanced { source: &latex }, attempt);
    let Patched::Text(patched) = repaired.patched else {
        unreachable!("latex_unbalanced always returns Patched::Text");
    };
    report.repair_log.push(repaired.log);

    let reoutcome = ctx.gates.validate("g3", &GateInput::Latex { source: &patched }).expect("g3 is always registered");
    record(report, "g3", &reoutcome);
    if reoutcome.valid {
        Ok(patched)
    } else {
        Err(StageError::GateFailed {
            gate_id: "g3".to_string(),
            detail: reoutcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

fn validate_numeric(
    ctx: &StageContext<'_>,
    check: NumericCheck,
    report: &mut ValidationReport,
) -> Result<NumericCheck, StageError> {
    let outcome = ctx
        .gates
        .validate("g4", &GateInput::Numeric { check: &check, trials: 0 })
        .expect("g4 is always registered");
    record(report, "g4", &outcome);
    if outcome.valid {
        return Ok(check);
    }

    let (kind, input) = match outcome.errors.first() {
        Some(GateError::MalformedExpression(_)) => ("numeric-parens", RepairInput::NumericParens { expr: &check.expr }),
        Some(GateError::NumericBelowThreshold { .. }) => ("numeric-tolerance", RepairInput::NumericTolerance { tolerance: check.tolerance }),
        _ => {
            // Forbidden tokens and anything else g4 might report have no
            // automated fix; surface the gate failure as-is.
            return Err(StageError::GateFailed {
                gate_id: "g4".to_string(),
                detail: outcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
            });
        }
    };

    let attempt = ctx
        .repair
        .begin_attempt("m3", &ctx.correlation_id.0, kind)
        .map_err(|err| StageError::RepairExhausted(kind.to_string(), err))?;
    let repaired = strategies::apply(input, attempt);
    let patched_check = match repaired.patched {
        Patched::Text(patched_expr) => NumericCheck { expr: patched_expr, ..check },
        Patched::Number(patched_tolerance) => NumericCheck { tolerance: patched_tolerance, ..check },
        Patched::Json(_) => unreachable!("numeric repairs never return Patched::Json"),
    };
    report.repair_log.push(repaired.log);

    let reoutcome = ctx
        .gates
        .validate("g4", &GateInput::Numeric { check: &patched_check, trials: 0 })
        .expect("g4 is always registered");
    record(report, "g4", &reoutcome);
    if reoutcome.valid {
        Ok(patched_check)
    } else {
        Err(StageError::GateFailed {
            gate_id: "g4".to_string(),
            detail: reoutcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

fn validate_expression(ctx: &StageContext<'_>, expr: &str, report: &mut ValidationReport) -> Result<(), StageError> {
    let outcome = ctx.gates.validate("g5", &GateInput::Expression { source: expr }).expect("g5 is always registered");
    record(report, "g5", &outcome);
    if outcome.valid {
        return Ok(());
    }

    let kind = "plot-expression";
    let attempt = ctx
        .repair
        .begin_attempt("m3", &ctx.correlation_id.0, kind)
        .map_err(|err| StageError::RepairExhausted(kind.to_string(), err))?;
    let repaired = strategies::apply(RepairInput::PlotExpression { expr }, attempt);
    let Patched::Text(patched) = repaired.patched else {
        unreachable!("plot_expression always returns Patched::Text");
    };
    report.repair_log.push(repaired.log);

    let reoutcome = ctx
        .gates
        .validate("g5", &GateInput::Expression { source: &patched })
        .expect("g5 is always registered");
    record(report, "g5", &reoutcome);
    if reoutcome.valid {
        Ok(())
    } else {
        Err(StageError::GateFailed {
            gate_id: "g5".to_string(),
            detail: reoutcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

fn validate_smiles(ctx: &StageContext<'_>, smiles: String, report: &mut ValidationReport) -> Result<String, StageError> {
    let outcome = ctx.gates.validate("g6", &GateInput::Smiles { smiles: &smiles }).expect("g6 is always registered");
    record(report, "g6", &outcome);
    if outcome.valid {
        return Ok(smiles);
    }

    let kind = "smiles-invalid";
    let attempt = ctx
        .repair
        .begin_attempt("m3", &ctx.correlation_id.0, kind)
        .map_err(|err| StageError::RepairExhausted(kind.to_string(), err))?;
    let repaired = strategies::apply(RepairInput::Smiles { smiles: &smiles }, attempt);
    let Patched::Text(patched) = repaired.patched else {
        unreachable!("smiles_invalid always returns Patched::Text");
    };
    report.repair_log.push(repaired.log);

    let reoutcome = ctx.gates.validate("g6", &GateInput::Smiles { smiles: &patched }).expect("g6 is always registered");
    record(report, "g6", &reoutcome);
    if reoutcome.valid {
        Ok(patched)
    } else {
        Err(StageError::GateFailed {
            gate_id: "g6".to_string(),
            detail: reoutcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

/// G7 (diagram topology) has no repair strategy in spec.md §4.9's
/// enumerated list; a failure here fails the section outright.
fn validate_diagram(ctx: &StageContext<'_>, spec: &DiagramSpec, report: &mut ValidationReport) -> Result<(), StageError> {
    let outcome = ctx.gates.validate("g7", &GateInput::Diagram { spec }).expect("g7 is always registered");
    record(report, "g7", &outcome);
    if outcome.valid {
        Ok(())
    } else {
        Err(StageError::GateFailed {
            gate_id: "g7".to_string(),
            detail: outcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

/// G11 (units) has no repair strategy in spec.md §4.9's enumerated list;
/// a dimensional mismatch fails the block outright.
fn validate_units(
    ctx: &StageContext<'_>,
    result_symbol: &str,
    expr: &str,
    units: &HashMap<String, String>,
    report: &mut ValidationReport,
) -> Result<(), StageError> {
    let unit_refs: HashMap<String, &str> = units.iter().map(|(k, v)| (k.clone(), v.as_str())).collect();
    let outcome = ctx
        .gates
        .validate(
            "g11",
            &GateInput::Units {
                lhs_expr: result_symbol,
                rhs_expr: expr,
                units: &unit_refs,
            },
        )
        .expect("g11 is always registered");
    record(report, "g11", &outcome);
    if outcome.valid {
        Ok(())
    } else {
        Err(StageError::GateFailed {
            gate_id: "g11".to_string(),
            detail: outcome.errors.first().map(std::string::ToString::to_string).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_markers_in_order() {
        let markers = asset_markers("a {{eq:e1}} b {{plot:p1}} c");
        assert_eq!(markers, vec!["eq:e1".to_string(), "plot:p1".to_string()]);
    }

    #[test]
    fn block_ids_are_zero_padded_within_a_section() {
        assert_eq!(block_id("003", 7), "003-block-07");
    }
}
