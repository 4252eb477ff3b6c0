//! The seam between the engine and whatever performs HTTP.

use std::fmt;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::ids::{AttemptId, ExamSetId};
use crate::response::RawResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Every backend request the engine makes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AttemptDetail { attempt_id: AttemptId },
    Analysis { attempt_id: AttemptId },
    Solutions {
        attempt_id: AttemptId,
        language: Option<String>,
    },
    UserAttempts,
    UserAttemptsFallback,
    Reattempt { exam_set_id: ExamSetId },
}

impl Endpoint {
    /// Stable label used in errors, logs and endpoint path tables.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::AttemptDetail { .. } => "attempt_detail",
            Endpoint::Analysis { .. } => "analysis",
            Endpoint::Solutions { .. } => "solutions",
            Endpoint::UserAttempts => "user_attempts",
            Endpoint::UserAttemptsFallback => "user_attempts_fallback",
            Endpoint::Reattempt { .. } => "reattempt",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Endpoint::Reattempt { .. } => Method::Post,
            _ => Method::Get,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Delivers one request and returns the raw response.
///
/// Implementations report only transport-level failures (connect, timeout)
/// as errors, as [`FetchError::Network`]. Status and content-type checks are
/// done by the caller on the returned [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint) -> Result<RawResponse, FetchError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, endpoint: &Endpoint) -> Result<RawResponse, FetchError> {
        (**self).send(endpoint).await
    }
}
