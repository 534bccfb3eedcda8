//! Configuration loading and validation.

use std::path::Path;

use crate::error::ConfigError;

pub mod schema;

pub use schema::{Config, ProviderConfig, RendererConfig};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.provider.endpoint.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "provider.endpoint must not be empty".to_string(),
        });
    }
    if config.renderer.endpoint.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "renderer.endpoint must not be empty".to_string(),
        });
    }
    if config.provider.timeout_seconds == 0 {
        return Err(ConfigError::Validation {
            message: "provider.timeoutSeconds must be greater than zero".to_string(),
        });
    }
    if config.renderer.timeout_seconds == 0 {
        return Err(ConfigError::Validation {
            message: "renderer.timeoutSeconds must be greater than zero".to_string(),
        });
    }
    Ok(())
}
