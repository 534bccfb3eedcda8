//! Job context endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use vitae::JobContext;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContextBody {
    pub project_id: String,
    pub body: String,
}

/// `POST /contexts` — stores an immutable targeting text.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateContextBody>,
) -> ApiResult<(StatusCode, Json<JobContext>)> {
    let context = state.jobs.create_context(&body.project_id, &body.body)?;
    Ok((StatusCode::CREATED, Json(context)))
}

/// `GET /contexts/project/{projectId}`
pub async fn list(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<JobContext>>> {
    Ok(Json(state.jobs.list_contexts(&project_id)?))
}
