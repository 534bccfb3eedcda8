//! Maps engine errors onto the wire error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vitae::VitaeError;

/// Envelope shared by all error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub struct ApiError(pub VitaeError);

impl From<VitaeError> for ApiError {
    fn from(e: VitaeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VitaeError::NotFound { .. } => StatusCode::NOT_FOUND,
            VitaeError::InvalidState(_) => StatusCode::CONFLICT,
            VitaeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            VitaeError::Provider(_) => StatusCode::BAD_GATEWAY,
            VitaeError::Internal(_) | VitaeError::Config(_) | VitaeError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
