//! Configuration schema.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine configuration, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Database file path. Defaults to `~/.vitae/data/vitae.db` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Generative provider backend.
    pub provider: ProviderConfig,
    /// Document renderer backend.
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// HTTP endpoint of the generative provider.
    pub endpoint: String,
    /// Bound on a single generation call. Generation routinely takes
    /// minutes, so the default is generous.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererConfig {
    /// HTTP endpoint of the document renderer.
    pub endpoint: String,
    #[serde(default = "default_renderer_timeout")]
    pub timeout_seconds: u64,
}

fn default_provider_timeout() -> u64 {
    180
}

fn default_renderer_timeout() -> u64 {
    60
}
