//! Error types shared across the engine.
//!
//! `FetchError` is defined here rather than in the HTTP crate so the loader
//! and sync service can classify failures (clear the cache, propagate for
//! re-authentication, degrade a secondary response) without string matching.

use thiserror::Error;

/// Message shown to the learner when a response could not be understood.
pub const TRY_AGAIN_MESSAGE: &str = "Something went wrong while loading your results. Please try again.";

/// Failures of a single backend request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The body was not JSON, or JSON of the wrong shape.
    #[error("malformed response from {endpoint}: {message}")]
    Shape { endpoint: String, message: String },

    /// The endpoint answered 404.
    #[error("{endpoint} not found")]
    NotFound { endpoint: String },

    /// The endpoint answered 401; the session must be re-established.
    #[error("authentication required for {endpoint}")]
    Auth { endpoint: String },

    /// Any other non-success status.
    #[error("API error (HTTP {status}) from {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The request itself failed (DNS, connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The view that issued the request went away before it finished.
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn shape(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Shape {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for 401 responses.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth { .. })
    }

    /// Returns `true` for 404 responses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    /// Whether the attempt-index cache must be dropped after this failure.
    ///
    /// Only auth failures leave the cache alone: the caller re-authenticates
    /// as the same user and the next refresh overwrites it.
    pub fn clears_cache(&self) -> bool {
        !matches!(self, FetchError::Auth { .. } | FetchError::Cancelled)
    }

    /// Text suitable for showing to the learner.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Auth { .. } => "Your session has expired. Please sign in again.".into(),
            FetchError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".into()
            }
            _ => TRY_AGAIN_MESSAGE.into(),
        }
    }
}

/// Failures of the local attempt-index store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("cache entry of {size} bytes exceeds the {limit} byte limit")]
    CapacityExceeded { size: usize, limit: usize },
}

/// Failures of an attempt-index refresh, sign-out or reattempt.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Fetch(e) if e.is_auth())
    }
}

/// Reasons a raw attempt record could not be turned into an `AttemptRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("attempt record is not a JSON object")]
    NotAnObject,

    #[error("attempt record has no exam-set id")]
    MissingExamSetId,

    #[error("attempt record has no attempt id")]
    MissingAttemptId,

    #[error("unexpected attempts payload: {0}")]
    UnexpectedPayload(String),
}
