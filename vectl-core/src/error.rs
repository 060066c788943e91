/// Structured error types for vectl-core library.
///
/// Binary crates (vectl-cli) and the embed pipeline use `anyhow` for
/// convenience, but library consumers get structured, composable errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vectl-core operations
#[derive(Error, Debug)]
pub enum VectlError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Compose manifest could not be parsed
    #[error("YAML error in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// TOML config could not be parsed
    #[error("TOML error in {path:?}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Compose duration string did not match the `1h2m3s` grammar
    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Port mapping was not `[ip:]host:container[/proto]`
    #[error("Invalid port mapping '{value}': {reason}")]
    InvalidPort { value: String, reason: String },

    /// Volume mount was not `source:target[:mode]`
    #[error("Invalid volume mount '{value}'")]
    InvalidMount { value: String },

    /// Manifest declares no service usable for the requested operation
    #[error("Missing service: {reason}")]
    MissingService { reason: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for vectl-core operations
pub type Result<T> = std::result::Result<T, VectlError>;

impl VectlError {
    /// Create a YAML error for a file
    pub fn yaml(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.into(),
            source,
        }
    }

    /// Create a TOML error for a file
    pub fn toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Toml {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid duration error
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid port error
    pub fn invalid_port(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPort {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid mount error
    pub fn invalid_mount(value: impl Into<String>) -> Self {
        Self::InvalidMount {
            value: value.into(),
        }
    }

    /// Create a missing service error
    pub fn missing_service(reason: impl Into<String>) -> Self {
        Self::MissingService {
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
