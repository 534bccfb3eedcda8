//! Invokes the external document renderer for a version and records the
//! outcome on the version store.
//!
//! A compile failure reported by the renderer is an expected, user-facing
//! outcome: the version is marked `error`, the raw diagnostics come back
//! unparaphrased, and nothing is thrown. Only a renderer that cannot be
//! reached at all raises a provider failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Result, VitaeError};
use crate::version::{CompileState, VersionStore};

/// Errors from a renderer call.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("renderer request failed: {0}")]
    Request(String),

    #[error("malformed renderer response: {0}")]
    MalformedResponse(String),
}

/// What the renderer did with the source text.
#[derive(Debug, Clone)]
pub enum RenderOutput {
    /// An artifact was produced; warnings may accompany it.
    Artifact { url: String, warnings: Vec<String> },
    /// The source was rejected with diagnostics.
    Rejected { diagnostics: Vec<String> },
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, content: &str) -> std::result::Result<RenderOutput, RendererError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderResponse {
    artifact_url: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Renderer backed by an HTTP endpoint that accepts `{"content": "..."}` and
/// answers either `{"artifactUrl": ..., "warnings": [...]}` or
/// `{"errors": [...]}`.
pub struct HttpRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRenderer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, content: &str) -> std::result::Result<RenderOutput, RendererError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RenderRequest { content })
            .send()
            .await
            .map_err(|e| RendererError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RendererError::Request(format!(
                "renderer returned HTTP {}",
                response.status()
            )));
        }

        let body: RenderResponse = response
            .json()
            .await
            .map_err(|e| RendererError::MalformedResponse(e.to_string()))?;

        match (body.artifact_url, body.errors) {
            (Some(url), _) => Ok(RenderOutput::Artifact {
                url,
                warnings: body.warnings,
            }),
            (None, errors) if !errors.is_empty() => {
                Ok(RenderOutput::Rejected { diagnostics: errors })
            }
            (None, _) => Err(RendererError::MalformedResponse(
                "renderer returned neither an artifact nor diagnostics".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStatus {
    Success,
    Warning,
    Error,
}

/// Outcome of a compile call, diagnostics verbatim from the renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileReport {
    pub status: CompileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    pub diagnostics: Vec<String>,
}

/// Drives the renderer for draft versions. Cloning is cheap.
#[derive(Clone)]
pub struct CompileCoordinator {
    versions: VersionStore,
    renderer: Arc<dyn Renderer>,
    render_timeout: Duration,
}

impl CompileCoordinator {
    pub fn new(versions: VersionStore, renderer: Arc<dyn Renderer>, render_timeout: Duration) -> Self {
        Self {
            versions,
            renderer,
            render_timeout,
        }
    }

    /// Renders a draft version and records the result.
    pub async fn compile(&self, version_id: &str) -> Result<CompileReport> {
        let version = self.versions.get_version(version_id)?;
        if version.compile_state != CompileState::Draft {
            return Err(VitaeError::InvalidState(format!(
                "version {} has already been compiled",
                version_id
            )));
        }

        let output =
            match tokio::time::timeout(self.render_timeout, self.renderer.render(&version.content))
                .await
            {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Err(VitaeError::Provider(format!("renderer failed: {}", e)));
                }
                Err(_) => {
                    return Err(VitaeError::Provider(format!(
                        "renderer timed out after {}s",
                        self.render_timeout.as_secs_f64()
                    )));
                }
            };

        match output {
            RenderOutput::Artifact { url, warnings } => {
                self.versions.mark_compiled(version_id, &url, &warnings)?;
                let status = if warnings.is_empty() {
                    CompileStatus::Success
                } else {
                    CompileStatus::Warning
                };
                log::info!(
                    "version {}: compiled with {} warnings",
                    version_id,
                    warnings.len()
                );
                Ok(CompileReport {
                    status,
                    artifact_url: Some(url),
                    diagnostics: warnings,
                })
            }
            RenderOutput::Rejected { diagnostics } => {
                self.versions.mark_error(version_id, &diagnostics)?;
                log::info!(
                    "version {}: compile failed with {} diagnostics",
                    version_id,
                    diagnostics.len()
                );
                Ok(CompileReport {
                    status: CompileStatus::Error,
                    artifact_url: None,
                    diagnostics,
                })
            }
        }
    }
}
