//! HTTP request API (spec.md §4.13): submit/status/compile over axum,
//! handing pipeline work to the thread-based orchestrator and rate
//! limiting the compile surface with `tower_governor`.

mod error;
mod handlers;
mod state;

pub use error::ApiError;
pub use state::{ApiConfig, AppState, JobRecord, JobStatus};

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full route tree. The compile routes sit behind a
/// `tower_governor` layer approximating spec.md §6's "100 per 15 minutes
/// per client" limit as a 100-token bucket refilled one token every 9
/// seconds (900s / 100), keyed by client IP.
#[must_use]
pub fn router(state: AppState) -> Router {
    let compile_governor_config = Box::leak(Box::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(9))
            .burst_size(100)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("governor config parameters are all valid constants"),
    ));

    let compile_routes = Router::new()
        .route("/v1/assets/compile", post(handlers::compile_single))
        .route("/v1/assets/compile/batch", post(handlers::compile_batch))
        .layer(GovernorLayer {
            config: compile_governor_config,
        });

    Router::new()
        .route("/v1/chapters", post(handlers::submit))
        .route("/v1/chapters/:prompt_id", get(handlers::status))
        .merge(compile_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
