//! Generative provider seam.
//!
//! The provider is a black box with unbounded latency and a nonzero failure
//! rate; the orchestrator bounds every call with a timeout and records
//! failures on the job instead of raising them to the submitter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a provider call. Transport failures and malformed responses
/// are kept distinct so the job's failure text tells the user which it was.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Everything the provider gets to see for one generation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub base_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Replacement content produced by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDraft {
    pub content: String,
}

#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDraft, ProviderError>;
}

/// Provider backed by an HTTP endpoint that accepts the request JSON and
/// answers `{"content": "..."}`.
pub struct HttpGenerativeProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGenerativeProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl GenerativeProvider for HttpGenerativeProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDraft, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let draft: GeneratedDraft = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        if draft.content.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "provider returned empty content".to_string(),
            ));
        }

        Ok(draft)
    }
}
