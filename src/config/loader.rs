//! Settings loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::CheckerConfig;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
///
/// Shared by the settings file, the global manifest and mirror descriptors:
/// whether an error is fatal depends on which document produced it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Document is well-formed but violates its schema or an invariant.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A schema itself could not be loaded or compiled.
    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("Invalid settings: {}", join_errors(.0))]
    Settings(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<CheckerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CheckerConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    validate_settings(&config).map_err(ConfigError::Settings)?;

    Ok(config)
}
