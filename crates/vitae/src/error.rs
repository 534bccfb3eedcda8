use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error taxonomy.
///
/// The first five variants are the domain taxonomy surfaced to callers;
/// `Config` and `Database` wrap module-level failures.
#[derive(Error, Debug)]
pub enum VitaeError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider failure: {0}")]
    Provider(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl VitaeError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code used in the wire error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::InvalidState(_) => "InvalidState",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Provider(_) => "ProviderFailure",
            Self::Internal(_) | Self::Config(_) | Self::Database(_) => "Internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, VitaeError>;
