//! Version endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vitae::{CompileReport, Version, VersionKind};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBaseBody {
    pub project_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBody {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVersionResponse {
    pub new_version_id: String,
}

/// `POST /versions` — creates the project's base version.
pub async fn create_base(
    State(state): State<AppState>,
    Json(body): Json<CreateBaseBody>,
) -> ApiResult<(StatusCode, Json<Version>)> {
    let version =
        state
            .versions
            .create_version(&body.project_id, None, VersionKind::Base, &body.content)?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// `GET /versions/{versionId}`
pub async fn get_version(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> ApiResult<Json<Version>> {
    Ok(Json(state.versions.get_version(&version_id)?))
}

/// `PUT /versions/{versionId}` — a manual edit always derives a new version,
/// never mutates the existing one.
pub async fn edit(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
    Json(body): Json<EditBody>,
) -> ApiResult<Json<NewVersionResponse>> {
    let parent = state.versions.get_version(&version_id)?;
    let version = state.versions.create_version(
        &parent.project_id,
        Some(&version_id),
        VersionKind::Manual,
        &body.content,
    )?;
    Ok(Json(NewVersionResponse {
        new_version_id: version.id,
    }))
}

/// `POST /versions/{versionId}/compile`
pub async fn compile(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> ApiResult<Json<CompileReport>> {
    Ok(Json(state.compiler.compile(&version_id).await?))
}

/// `POST /versions/{versionId}/activate` — moves the ACTIVE marker.
pub async fn activate(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> ApiResult<Json<Version>> {
    Ok(Json(state.versions.set_active(&version_id)?))
}

/// `GET /versions/project/{projectId}` — newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<Version>>> {
    Ok(Json(state.versions.list_versions(&project_id)?))
}
