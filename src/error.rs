//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while flushing transactions to the server.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the flush can be retried.
        retryable: bool,
    },

    /// The server answered outside the 2xx range.
    #[error("server returned HTTP {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Malformed or unrecognized response body.
    ///
    /// Treated as transient: a garbled body says nothing about whether the
    /// transactions were rejected, so the pending set is kept and retried.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote document moved past the version this session believes in.
    ///
    /// Retrying the same flush cannot succeed; the user must reload.
    #[error("remote document has moved past local version {version}")]
    VersionConflict {
        /// The version this session believed the server held.
        version: u64,
    },
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if re-running the same flush may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            EngineError::Http { .. } => true,
            EngineError::Protocol(_) => true,
            EngineError::VersionConflict { .. } => false,
        }
    }
}
