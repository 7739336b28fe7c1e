//! Command-line surface: `generate` runs one request to completion in this
//! process, `serve` exposes the same pipeline over the HTTP request API,
//! `doctor` runs the read-only health probe. `main.rs` only maps the
//! returned `ExitCode` to a process exit status.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use readerforge_error::ExitCode;
use readerforge_orchestrator::Pipeline;
use readerforge_phases::StageContext;
use readerforge_types::{ChapterRequest, CorrelationId, Difficulty, Subject};

use crate::config::{CliOverrides, Config};

#[derive(Parser)]
#[command(name = "readerforge", version, about = "Content-generation pipeline orchestrator")]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one chapter request end-to-end and write the resulting document.
    Generate {
        #[arg(long)]
        grade: String,
        #[arg(long, value_enum)]
        subject: SubjectArg,
        #[arg(long)]
        chapter: String,
        #[arg(long)]
        standard: String,
        #[arg(long, value_enum)]
        difficulty: DifficultyArg,
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Serve the submit/status/compile HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Probe cache/lock/output directory writability and LLM reachability.
    Doctor,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum SubjectArg {
    Physics,
    Chemistry,
    Mathematics,
}

impl From<SubjectArg> for Subject {
    fn from(value: SubjectArg) -> Self {
        match value {
            SubjectArg::Physics => Subject::Physics,
            SubjectArg::Chemistry => Subject::Chemistry,
            SubjectArg::Mathematics => Subject::Mathematics,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum DifficultyArg {
    Comfort,
    Hustle,
    Advanced,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Comfort => Difficulty::Comfort,
            DifficultyArg::Hustle => Difficulty::Hustle,
            DifficultyArg::Advanced => Difficulty::Advanced,
        }
    }
}

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        ..Default::default()
    };
    let config = Config::discover(&overrides).map_err(|err| {
        tracing::error!(%err, "failed to resolve configuration");
        ExitCode::CliArgs
    })?;

    match cli.command {
        Command::Generate {
            grade,
            subject,
            chapter,
            standard,
            difficulty,
            output_dir,
        } => run_generate(&config, grade, subject.into(), chapter, standard, difficulty.into(), output_dir),
        Command::Serve { port } => run_serve(&config, port),
        Command::Doctor => run_doctor(&config),
    }
}

fn run_generate(
    config: &Config,
    grade: String,
    subject: Subject,
    chapter: String,
    standard: String,
    difficulty: Difficulty,
    output_dir: Option<String>,
) -> Result<(), ExitCode> {
    let runtime = crate::app::Runtime::build(config).map_err(|err| {
        tracing::error!(%err, "failed to build runtime");
        ExitCode::CliArgs
    })?;

    let request = ChapterRequest {
        grade,
        subject,
        chapter: chapter.clone(),
        standard,
        difficulty,
        attachments: Vec::new(),
        correlation_id: None,
    };

    let prompt_id = uuid_like_id(&chapter);
    let correlation_id = CorrelationId(prompt_id.clone());

    let ctx = StageContext::new(correlation_id, &runtime.gateway, &runtime.gates, &runtime.repair);
    let pipeline = Pipeline::new(
        ctx,
        readerforge_orchestrator::PipelineConfig {
            section_concurrency: config.section_concurrency,
            reference_index: Vec::new(),
        },
    );

    let chapter_slug = slugify(&chapter);
    let started_at = chrono::Utc::now();

    let out_dir = output_dir
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| config.output_dir.clone());

    let run = pipeline.run(&chapter_slug, &request);

    let cache_stats = runtime.gateway.cache_stats();
    let pipeline_stats = pipeline.stats();
    let stage_durations = pipeline_stats
        .stage_durations
        .iter()
        .map(|timing| crate::receipts::StageDuration {
            stage: timing.stage.to_string(),
            duration_ms: timing.duration_ms,
        })
        .collect();

    let base_receipt = |succeeded: bool, final_state: &str, error: Option<String>| crate::receipts::RunReceipt {
        schema_version: 1,
        prompt_id: prompt_id.clone(),
        correlation_id: prompt_id.clone(),
        started_at,
        finished_at: chrono::Utc::now(),
        succeeded,
        final_state: final_state.to_string(),
        error,
        stage_durations,
        cache_hits: cache_stats.hits,
        cache_misses: cache_stats.misses,
        retry_attempts: runtime.gateway.retry_attempts(),
        circuit_breaker_trips: runtime.gateway.breaker_trips(),
        gates_passed: pipeline_stats.gates_passed,
        gates_failed: pipeline_stats.gates_failed,
    };

    match run {
        Ok((_fsm, doc)) => {
            let bytes = serde_json::to_vec_pretty(&doc).expect("ReaderDoc always serializes");
            let path = out_dir.join("chapters").join(format!("{prompt_id}.json"));
            readerforge_publish::publish(&path, &bytes, &prompt_id, false).map_err(|err| {
                tracing::error!(%err, "failed to publish generated document");
                ExitCode::Unknown
            })?;

            let receipt = base_receipt(true, "completed", None);
            let _ = receipt.publish(&out_dir);

            println!("{path}");
            Ok(())
        }
        Err(err) => {
            tracing::error!(%err, "pipeline run failed");
            let receipt = base_receipt(false, "failed", Some(err.to_string()));
            let _ = receipt.publish(&out_dir);
            Err(ExitCode::BackendFailure)
        }
    }
}

fn run_serve(config: &Config, port: u16) -> Result<(), ExitCode> {
    let runtime = crate::app::Runtime::build(config).map_err(|err| {
        tracing::error!(%err, "failed to build runtime");
        ExitCode::CliArgs
    })?;

    let api_config = readerforge_api::ApiConfig {
        section_concurrency: config.section_concurrency,
        lock_dir: config.lock_dir.clone(),
        output_dir: config.output_dir.clone(),
        idempotency_ttl_secs: config.idempotency_ttl_secs,
        lock_ttl_secs: config.lock_ttl_secs,
    };

    let state = readerforge_api::AppState::new(
        runtime.gateway,
        runtime.gates,
        runtime.repair,
        runtime.compilers,
        runtime.idempotency,
        api_config,
    );

    let router = readerforge_api::router(state);

    let tokio_runtime = tokio::runtime::Runtime::new().map_err(|err| {
        tracing::error!(%err, "failed to start async runtime");
        ExitCode::Unknown
    })?;

    tokio_runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|err| {
                tracing::error!(%err, "failed to bind listener");
                ExitCode::CliArgs
            })?;
        tracing::info!(port, "readerforge API listening");
        axum::serve(listener, router).await.map_err(|err| {
            tracing::error!(%err, "server exited with an error");
            ExitCode::Unknown
        })
    })
}

fn run_doctor(config: &Config) -> Result<(), ExitCode> {
    let report = crate::doctor::run(config);
    println!("{}", serde_json::to_string_pretty(&report).expect("DoctorReport always serializes"));
    if report.healthy() {
        Ok(())
    } else {
        Err(ExitCode::CliArgs)
    }
}

fn slugify(chapter: &str) -> String {
    chapter
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

fn uuid_like_id(seed: &str) -> String {
    let hash = readerforge_canon::hash_canonical_json(&(seed, chrono::Utc::now().timestamp_nanos_opt()))
        .unwrap_or_else(|_| readerforge_types::ContentHash::from_hex(&"0".repeat(64)));
    hash.as_str().trim_start_matches("sha256:")[..16].to_string()
}
