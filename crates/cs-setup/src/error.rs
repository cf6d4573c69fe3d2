// error.rs — Error types for setup detection, reconciliation and execution.

use std::path::Path;

use cs_policy::{RegistryError, ValidationError};
use thiserror::Error;

/// Errors that can occur while planning or executing a setup run.
///
/// Only invariant breaks and unrecoverable I/O surface here. Degraded
/// conditions (corrupt settings file, missing config, failed backup) are
/// logged at `warn` and the run continues.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize a policy document.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document about to be written failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The capability registry could not be assembled.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The pre-write backup could not be created (fatal only under `strict_backup`).
    #[error("backup of {path} failed: {source}")]
    Backup {
        path: String,
        source: std::io::Error,
    },

    /// The setup config file exists but could not be parsed.
    #[error("invalid config at {path}: {message}")]
    Config { path: String, message: String },

    /// The project profile file could not be read or parsed.
    #[error("invalid project profile at {path}: {message}")]
    Profile { path: String, message: String },

    /// A documentation sink failed.
    #[error("documentation sink '{sink}' failed: {message}")]
    Documentation { sink: String, message: String },
}

impl SetupError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        SetupError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
