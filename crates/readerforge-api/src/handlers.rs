//! Submit/status/compile handlers (spec.md §4.13, §6).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use readerforge_orchestrator::{correlation_id_for, Pipeline, PipelineConfig};
use readerforge_phases::StageContext;
use readerforge_types::{AssetSpec, ChapterRequest, ChemistrySpec, ContentHash, CorrelationId, DiagramSpec, PlotSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::{AppState, JobRecord, JobStatus};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub grade: String,
    pub subject: readerforge_types::Subject,
    pub chapter: String,
    pub standard: String,
    pub difficulty: readerforge_types::Difficulty,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub prompt_id: String,
    pub status_url: String,
}

fn resource_id(request: &ChapterRequest) -> String {
    format!("{}::{}", request.subject.as_str(), request.chapter)
}

/// `POST /v1/chapters`.
pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let request = ChapterRequest {
        grade: body.grade,
        subject: body.subject,
        chapter: body.chapter,
        standard: body.standard,
        difficulty: body.difficulty,
        attachments: body.attachments,
        correlation_id: body.correlation_id,
    };

    let attachment_hashes: Vec<ContentHash> = request
        .attachments
        .iter()
        .map(|a| readerforge_canon::hash_canonical_json(a))
        .collect::<anyhow::Result<_>>()
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let key = readerforge_idempotency::generate_key("submit", &request, &attachment_hashes)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    if let Some(existing) = state
        .idempotency
        .check_duplicate(key.as_str())
        .map_err(|err| ApiError::Internal(err.to_string()))?
    {
        let prompt_id = existing
            .metadata
            .get("prompt_id")
            .cloned()
            .unwrap_or_else(|| key.as_str().to_string());
        return Ok(Json(SubmitResponse {
            success: true,
            status_url: format!("/v1/chapters/{prompt_id}"),
            prompt_id,
        }));
    }

    let prompt_id = key.as_str().trim_start_matches("sha256:")[..16].to_string();
    let correlation_id = correlation_id_for(&request, &prompt_id);

    let lock = readerforge_lock::Lock::acquire(
        &state.config.lock_dir,
        "submit",
        &resource_id(&request),
        false,
        Some(state.config.lock_ttl_secs),
    )
    .map_err(|err| ApiError::Locked(err.to_string()))?;

    let mut metadata = BTreeMap::new();
    metadata.insert("prompt_id".to_string(), prompt_id.clone());
    metadata.insert("chapter".to_string(), request.chapter.clone());
    state
        .idempotency
        .register_request(key.as_str(), correlation_id.clone(), metadata)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    state
        .jobs
        .lock()
        .unwrap()
        .insert(prompt_id.clone(), JobRecord::accepted(prompt_id.clone()));

    spawn_pipeline_run(state.clone(), lock, key.as_str().to_string(), prompt_id.clone(), correlation_id, request);

    Ok(Json(SubmitResponse {
        success: true,
        status_url: format!("/v1/chapters/{prompt_id}"),
        prompt_id,
    }))
}

/// Runs the pipeline on a dedicated OS thread (the orchestrator is
/// thread-based per spec.md §5) and folds the outcome back into the job
/// table and idempotency store when it finishes. The lock is held for the
/// thread's lifetime and released by its `Drop` impl on return.
fn spawn_pipeline_run(
    state: AppState,
    lock: readerforge_lock::Lock,
    idempotency_key: String,
    prompt_id: String,
    correlation_id: CorrelationId,
    request: ChapterRequest,
) {
    std::thread::spawn(move || {
        let _lock = lock;

        if let Some(job) = state.jobs.lock().unwrap().get_mut(&prompt_id) {
            job.status = JobStatus::Processing;
            job.stage = "planning".to_string();
            job.updated_at = Utc::now();
        }

        let ctx = StageContext::new(correlation_id, &state.gateway, &state.gates, &state.repair);
        let pipeline = Pipeline::new(
            ctx,
            PipelineConfig {
                section_concurrency: state.config.section_concurrency,
                reference_index: Vec::new(),
            },
        );

        let chapter_slug = slugify(&request.chapter);
        let outcome = pipeline.run(&chapter_slug, &request);

        let mut jobs = state.jobs.lock().unwrap();
        let now = Utc::now();
        match outcome {
            Ok((_fsm, doc)) => {
                let payload = serde_json::to_value(&doc).unwrap_or(Value::Null);
                let path = state
                    .config
                    .output_dir
                    .join("chapters")
                    .join(format!("{prompt_id}.json"));
                let bytes = serde_json::to_vec_pretty(&payload).unwrap_or_default();
                let published = readerforge_publish::publish(&path, &bytes, &prompt_id, false);

                let _ = state
                    .idempotency
                    .complete_request(&idempotency_key, Some(payload.clone()), None);

                if let Some(job) = jobs.get_mut(&prompt_id) {
                    job.status = JobStatus::Completed;
                    job.stage = "completed".to_string();
                    job.progress = 100;
                    job.updated_at = now;
                    job.result = Some(payload);
                    job.artifacts = published.ok().map(|p| serde_json::json!({ "file_path": p.file_path.to_string() }));
                }
            }
            Err(err) => {
                let message = err.to_string();
                let _ = state
                    .idempotency
                    .complete_request(&idempotency_key, None, Some(message.clone()));

                if let Some(job) = jobs.get_mut(&prompt_id) {
                    job.status = JobStatus::Failed;
                    job.stage = "failed".to_string();
                    job.updated_at = now;
                    job.error = Some(message);
                }
            }
        }
    });
}

fn slugify(chapter: &str) -> String {
    chapter
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// `GET /v1/chapters/:prompt_id`.
pub async fn status(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .jobs
        .lock()
        .unwrap()
        .get(&prompt_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound { resource: format!("chapter {prompt_id}") })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileAssetType {
    Plot,
    Diagram,
    Chem,
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    #[serde(rename = "type")]
    pub asset_type: CompileAssetType,
    pub spec: Value,
    pub identifier: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub options: Option<Value>,
}

fn default_format() -> String {
    "svg".to_string()
}

#[derive(Debug, Serialize, Clone)]
pub struct CompileResult {
    pub identifier: String,
    pub success: bool,
    pub svg: Option<String>,
    pub error: Option<String>,
}

const IDENTIFIER_LEN_MAX: usize = 100;

fn validate_identifier(identifier: &str) -> Result<(), ApiError> {
    let valid = !identifier.is_empty()
        && identifier.len() <= IDENTIFIER_LEN_MAX
        && identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "identifier '{identifier}' does not match ^[a-zA-Z0-9_-]{{1,100}}$"
        )))
    }
}

fn build_spec(asset_type: &CompileAssetType, spec: Value) -> Result<AssetSpec, ApiError> {
    match asset_type {
        CompileAssetType::Plot => serde_json::from_value::<PlotSpec>(spec)
            .map(AssetSpec::Plot)
            .map_err(|err| ApiError::BadRequest(err.to_string())),
        CompileAssetType::Diagram => serde_json::from_value::<DiagramSpec>(spec)
            .map(AssetSpec::Diagram)
            .map_err(|err| ApiError::BadRequest(err.to_string())),
        CompileAssetType::Chem => serde_json::from_value::<ChemistrySpec>(spec)
            .map(AssetSpec::Chem)
            .map_err(|err| ApiError::BadRequest(err.to_string())),
    }
}

async fn compile_one(state: AppState, request: CompileRequest) -> CompileResult {
    let identifier = request.identifier.clone();

    if request.format != "svg" {
        return CompileResult {
            identifier,
            success: false,
            svg: None,
            error: Some(format!("unsupported output format '{}': only svg is implemented", request.format)),
        };
    }

    if let Err(err) = validate_identifier(&identifier) {
        return CompileResult {
            identifier,
            success: false,
            svg: None,
            error: Some(err.to_string()),
        };
    }

    let spec = match build_spec(&request.asset_type, request.spec) {
        Ok(spec) => spec,
        Err(err) => {
            return CompileResult {
                identifier,
                success: false,
                svg: None,
                error: Some(err.to_string()),
            }
        }
    };

    let compilers = Arc::clone(&state.compilers);
    let correlation_id = identifier.clone();
    let outcome = tokio::task::spawn_blocking(move || compilers.compile(&spec, &correlation_id))
        .await
        .map_err(|err| err.to_string())
        .and_then(|r| r.map_err(|err| err.to_string()));

    match outcome {
        Ok(Some(outcome)) => CompileResult {
            identifier,
            success: outcome.success,
            svg: outcome.svg,
            error: outcome.error,
        },
        Ok(None) => CompileResult {
            identifier,
            success: false,
            svg: None,
            error: Some("no compiler registered for this asset kind".to_string()),
        },
        Err(reason) => CompileResult {
            identifier,
            success: false,
            svg: None,
            error: Some(reason),
        },
    }
}

/// `POST /v1/assets/compile`.
pub async fn compile_single(
    State(state): State<AppState>,
    Json(request): Json<CompileRequest>,
) -> Json<CompileResult> {
    Json(compile_one(state, request).await)
}

#[derive(Debug, Deserialize)]
pub struct CompileBatchRequest {
    pub items: Vec<CompileRequest>,
}

#[derive(Serialize)]
pub struct CompileBatchResponse {
    pub results: Vec<CompileResult>,
}

/// `POST /v1/assets/compile/batch`.
pub async fn compile_batch(
    State(state): State<AppState>,
    Json(request): Json<CompileBatchRequest>,
) -> Json<CompileBatchResponse> {
    let mut handles = Vec::with_capacity(request.items.len());
    for item in request.items {
        handles.push(tokio::spawn(compile_one(state.clone(), item)));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap_or(CompileResult {
            identifier: "unknown".to_string(),
            success: false,
            svg: None,
            error: Some("compile task panicked".to_string()),
        }));
    }

    Json(CompileBatchResponse { results })
}
