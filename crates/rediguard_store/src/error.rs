//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a backing store handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The connection was dropped or the server became unreachable.
    ///
    /// This is the only transient class: callers may reconnect and
    /// re-issue the command.
    #[error("connection lost: {0}")]
    Disconnected(String),

    /// Authentication was rejected by the server.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The key holds a value of a different type than the command expects.
    #[error("wrong type: {0}")]
    WrongType(String),

    /// The stored value cannot be interpreted as an integer.
    #[error("value is not an integer or out of range")]
    NotInteger,

    /// The requested database index does not exist.
    #[error("invalid database index {0}")]
    InvalidDatabase(u32),

    /// Any other error reported by the server or the client library.
    #[error("server error: {0}")]
    Server(String),
}

impl StoreError {
    /// Creates a disconnect error.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::Disconnected(message.into())
    }

    /// Creates a generic server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }

    /// Returns true if the error means the connection itself is gone.
    pub fn is_transient_disconnect(&self) -> bool {
        matches!(self, StoreError::Disconnected(_))
    }
}
