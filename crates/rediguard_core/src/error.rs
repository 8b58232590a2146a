//! Error types for rediguard core.

use rediguard_codec::CodecError;
use rediguard_store::StoreError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced to callers of the client.
///
/// Transient disconnects never appear here: the dispatcher reconnects and
/// retries them. Callers see either the result or one of these.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The configuration is unusable.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong with it.
        message: String,
    },

    /// Establishing the initial connection failed.
    ///
    /// The underlying store error is kept as the source.
    #[error("connection failed")]
    Connection {
        /// Cause reported by the store.
        #[source]
        source: StoreError,
    },

    /// The store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A value could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The reconnect loop was stopped by a cancellation token.
    #[error("reconnect cancelled")]
    Cancelled,
}

impl CoreError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a connection error wrapping the store's cause.
    pub fn connection(source: StoreError) -> Self {
        Self::Connection { source }
    }
}
