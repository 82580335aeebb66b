//! Unified error types for the card core.
//!
//! Every failure an operation can raise belongs to exactly one [`ErrorKind`].
//! Callers branch on the kind (e.g. to pick a status code); the message is
//! diagnostic only.

use sea_orm::DbErr;
use thiserror::Error;

/// Failure classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown API key or failed credential verification
    Unauthorized,
    /// Input rejected by policy (expired card, wrong category, low balance...)
    BadRequest,
    /// Duplicate card for the same employee and category
    Conflict,
    /// Unknown card or business
    NotFound,
    /// Anything unclassified, including store failures
    Internal,
}

/// Crate error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller could not be authenticated
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Diagnostic message
        message: String,
    },

    /// Request is malformed or violates card policy
    #[error("Bad request: {message}")]
    BadRequest {
        /// Diagnostic message
        message: String,
    },

    /// Request collides with an existing record
    #[error("Conflict: {message}")]
    Conflict {
        /// Diagnostic message
        message: String,
    },

    /// Referenced record does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Diagnostic message
        message: String,
    },

    /// Invariant broken inside the core (corrupt stored data, overflow, hashing failure)
    #[error("Internal error: {message}")]
    Internal {
        /// Diagnostic message
        message: String,
    },

    /// Failure signalled by the record store
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Diagnostic message
        message: String,
    },
}

impl Error {
    /// Classifies this error into the closed set of kinds callers handle.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } | Self::Database(_) | Self::Config { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
