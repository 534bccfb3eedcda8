//! Router assembly for the HTTP API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod contexts;
mod jobs;
mod versions;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ai/jobs", post(jobs::submit).get(jobs::list))
        .route("/ai/jobs/{jobId}", get(jobs::status))
        .route("/ai/jobs/{jobId}/proposal", get(jobs::proposal))
        .route("/ai/jobs/{jobId}/accept", post(jobs::accept))
        .route("/ai/jobs/{jobId}/reject", post(jobs::reject))
        .route("/ai/jobs/{jobId}/refine", post(jobs::refine))
        .route("/versions", post(versions::create_base))
        .route(
            "/versions/{versionId}",
            get(versions::get_version).put(versions::edit),
        )
        .route("/versions/{versionId}/compile", post(versions::compile))
        .route("/versions/{versionId}/activate", post(versions::activate))
        .route("/versions/project/{projectId}", get(versions::list))
        .route("/contexts", post(contexts::create))
        .route("/contexts/project/{projectId}", get(contexts::list))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
