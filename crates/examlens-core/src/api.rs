//! Typed access to the exam backend over any [`Transport`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::attempt::{AttemptDetail, ReattemptTicket};
use crate::error::FetchError;
use crate::ids::{AttemptId, ExamSetId};
use crate::normalize::{parse_attempts_payload, RawAttempt};
use crate::report::AnalysisReport;
use crate::solution::SolutionsPayload;
use crate::transport::{Endpoint, Transport};

/// Which user-attempts route to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptsRoute {
    Primary,
    Fallback,
}

impl AttemptsRoute {
    fn endpoint(self) -> Endpoint {
        match self {
            AttemptsRoute::Primary => Endpoint::UserAttempts,
            AttemptsRoute::Fallback => Endpoint::UserAttemptsFallback,
        }
    }
}

/// Sends requests and validates each response independently.
pub struct ExamApi<T> {
    transport: T,
}

impl<T: Transport> ExamApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn fetch<R: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<R, FetchError> {
        let response = self.transport.send(&endpoint).await?;
        debug!(
            endpoint = endpoint.name(),
            status = response.status,
            bytes = response.body.len(),
            "response received"
        );
        crate::response::validate_json(endpoint.name(), &response)
    }

    pub async fn attempt_detail(&self, attempt_id: &AttemptId) -> Result<AttemptDetail, FetchError> {
        self.fetch(Endpoint::AttemptDetail {
            attempt_id: attempt_id.clone(),
        })
        .await
    }

    pub async fn analysis(&self, attempt_id: &AttemptId) -> Result<AnalysisReport, FetchError> {
        self.fetch(Endpoint::Analysis {
            attempt_id: attempt_id.clone(),
        })
        .await
    }

    pub async fn solutions(
        &self,
        attempt_id: &AttemptId,
        language: Option<&str>,
    ) -> Result<SolutionsPayload, FetchError> {
        self.fetch(Endpoint::Solutions {
            attempt_id: attempt_id.clone(),
            language: language.map(str::to_string),
        })
        .await
    }

    /// Raw attempt records from one user-attempts route.
    pub async fn user_attempts(&self, route: AttemptsRoute) -> Result<Vec<RawAttempt>, FetchError> {
        let endpoint = route.endpoint();
        let name = endpoint.name();
        let payload: Value = self.fetch(endpoint).await?;
        parse_attempts_payload(payload).map_err(|e| FetchError::shape(name, e.to_string()))
    }

    pub async fn reattempt(&self, exam_set_id: &ExamSetId) -> Result<ReattemptTicket, FetchError> {
        self.fetch(Endpoint::Reattempt {
            exam_set_id: exam_set_id.clone(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::response::RawResponse;
    use serde_json::json;

    #[tokio::test]
    async fn keyed_attempts_payload() {
        let api = ExamApi::new(MockTransport::new().json(
            "user_attempts",
            json!({"data": {"es1": {"attempt_id": "a1"}, "es2": null}}),
        ));
        let raw = api.user_attempts(AttemptsRoute::Primary).await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].key_hint.as_deref(), Some("es1"));
    }

    #[tokio::test]
    async fn scalar_attempts_payload_is_shape_error() {
        let api = ExamApi::new(MockTransport::new().json("user_attempts_fallback", json!(42)));
        let err = api.user_attempts(AttemptsRoute::Fallback).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::shape(
                "user_attempts_fallback",
                "unexpected attempts payload: number"
            )
        );
    }

    #[tokio::test]
    async fn solutions_carry_language() {
        let api = ExamApi::new(MockTransport::new().json(
            "solutions",
            json!({"language": "hi", "solutions": [{"question_id": 1}]}),
        ));
        let payload = api.solutions(&"a1".into(), Some("hi")).await.unwrap();
        assert_eq!(payload.solutions.len(), 1);
        assert_eq!(
            api.transport().requests(),
            vec![Endpoint::Solutions {
                attempt_id: "a1".into(),
                language: Some("hi".into()),
            }]
        );
    }

    #[tokio::test]
    async fn html_detail_is_shape_error() {
        let api = ExamApi::new(MockTransport::new().respond(
            "attempt_detail",
            Ok(RawResponse::new(200, Some("text/html"), "<html/>")),
        ));
        let err = api.attempt_detail(&"a1".into()).await.unwrap_err();
        assert!(matches!(err, FetchError::Shape { .. }));
    }
}
