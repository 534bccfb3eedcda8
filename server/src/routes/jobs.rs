//! Generation job endpoints.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vitae::{Job, Proposal, SubmitRequest};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub project_id: String,
    pub base_version_id: String,
    #[serde(default)]
    pub job_context_id: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobIdResponse {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptBody {
    #[serde(default)]
    pub accepted_sections: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub new_version_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineBody {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

/// `POST /ai/jobs` — accepted, not yet done.
pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<(StatusCode, Json<JobIdResponse>)> {
    let job = state.jobs.submit(SubmitRequest {
        project_id: body.project_id,
        base_version_id: body.base_version_id,
        context_id: body.job_context_id,
        instructions: body.instructions,
    })?;
    Ok((StatusCode::ACCEPTED, Json(JobIdResponse { job_id: job.id })))
}

/// `GET /ai/jobs/{jobId}` — the polling endpoint.
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(state.jobs.get_status(&job_id)?))
}

/// `GET /ai/jobs?projectId=`
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(state.jobs.list_jobs(&params.project_id)?))
}

/// `GET /ai/jobs/{jobId}/proposal` — 404 until the job completes.
pub async fn proposal(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Proposal>> {
    Ok(Json(state.reconciler.get_proposal(&job_id)?))
}

/// `POST /ai/jobs/{jobId}/accept` — commits a new version. Omitting
/// `acceptedSections` applies the default selection (all modified sections).
pub async fn accept(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(body): Json<AcceptBody>,
) -> ApiResult<Json<AcceptResponse>> {
    let selection: Option<HashSet<String>> =
        body.accepted_sections.map(|names| names.into_iter().collect());
    let version = state.reconciler.accept(&job_id, selection.as_ref())?;
    Ok(Json(AcceptResponse {
        new_version_id: version.id,
    }))
}

/// `POST /ai/jobs/{jobId}/reject` — discards the proposal, writes nothing.
pub async fn reject(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Empty>> {
    state.reconciler.reject(&job_id)?;
    Ok(Json(Empty {}))
}

/// `POST /ai/jobs/{jobId}/refine` — new chained job, same base version.
pub async fn refine(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(body): Json<RefineBody>,
) -> ApiResult<(StatusCode, Json<JobIdResponse>)> {
    let job = state.jobs.refine(&job_id, &body.feedback)?;
    Ok((StatusCode::ACCEPTED, Json(JobIdResponse { job_id: job.id })))
}
