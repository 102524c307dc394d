//! Manifest error types

use std::path::PathBuf;

use predefine_engine::RegistrationError;
use thiserror::Error;

/// Manifest errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid predefined-types manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;
