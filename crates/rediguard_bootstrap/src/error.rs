//! Error types for configuration bootstrap.

use thiserror::Error;

/// Result type for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The file could not be read or written.
    #[error("config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized.
    #[error("config file JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
