//! `reqwest` implementation of the engine's [`Transport`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use tracing::{debug, instrument};

use examlens_core::error::FetchError;
use examlens_core::response::RawResponse;
use examlens_core::transport::{Endpoint, Method, Transport};

use crate::config::EndpointPaths;

/// Talks to the exam backend over HTTP.
///
/// Only transport failures become errors here. Status and content-type
/// are handed through untouched for the engine to judge.
pub struct HttpTransport {
    base_url: Url,
    api_token: Option<String>,
    paths: EndpointPaths,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        paths: EndpointPaths,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base_url: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base_url cannot carry a path: {base_url}");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            api_token,
            paths,
            timeout,
            client,
        })
    }

    /// Full URL for `endpoint`, with ids substituted as single path segments.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url, FetchError> {
        let template = self.paths.template(endpoint);
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FetchError::Network(format!("base_url cannot carry a path: {}", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in template.split('/').filter(|s| !s.is_empty()) {
                segments.push(&substitute(segment, endpoint));
            }
        }
        if let Endpoint::Solutions {
            language: Some(language),
            ..
        } = endpoint
        {
            url.query_pairs_mut().append_pair("language", language);
        }
        Ok(url)
    }
}

fn substitute(segment: &str, endpoint: &Endpoint) -> String {
    match endpoint {
        Endpoint::AttemptDetail { attempt_id }
        | Endpoint::Analysis { attempt_id }
        | Endpoint::Solutions { attempt_id, .. } => {
            segment.replace("{attempt_id}", attempt_id.as_str())
        }
        Endpoint::Reattempt { exam_set_id } => {
            segment.replace("{exam_set_id}", exam_set_id.as_str())
        }
        Endpoint::UserAttempts | Endpoint::UserAttemptsFallback => segment.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(endpoint = endpoint.name()))]
    async fn send(&self, endpoint: &Endpoint) -> Result<RawResponse, FetchError> {
        let url = self.url_for(endpoint)?;
        debug!(method = %endpoint.method(), %url, "sending request");

        let mut req = match endpoint.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url).json(&serde_json::json!({})),
        };
        req = req.header(ACCEPT, "application/json");
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| self.network_error(e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| self.network_error(e))?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

impl HttpTransport {
    fn network_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Network(format!("request timed out after {}s", self.timeout.as_secs()))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examlens_core::api::{AttemptsRoute, ExamApi};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer, token: Option<&str>) -> HttpTransport {
        HttpTransport::new(
            &server.uri(),
            token.map(str::to_string),
            EndpointPaths::default(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn passes_status_and_content_type_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attempts/a1/analysis"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>maintenance</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let response = transport(&server, Some("tok"))
            .send(&Endpoint::Analysis {
                attempt_id: "a1".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
        assert!(response.body.contains("maintenance"));
    }

    #[tokio::test]
    async fn html_page_is_a_shape_error_through_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attempts/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html/>", "text/html"))
            .mount(&server)
            .await;

        let api = ExamApi::new(transport(&server, None));
        let err = api.attempt_detail(&"a1".into()).await.unwrap_err();
        assert!(matches!(err, FetchError::Shape { .. }));
    }

    #[tokio::test]
    async fn solutions_send_language_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attempts/a1/solutions"))
            .and(query_param("language", "hi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language": "hi",
                "solutions": [{"question_id": 1, "selected_option": "A"}]
            })))
            .mount(&server)
            .await;

        let api = ExamApi::new(transport(&server, None));
        let payload = api.solutions(&"a1".into(), Some("hi")).await.unwrap();
        assert_eq!(payload.language.as_deref(), Some("hi"));
        assert_eq!(payload.solutions.len(), 1);
    }

    #[tokio::test]
    async fn reattempt_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/exam-sets/es%201/reattempt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"attempt_id": 91})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = ExamApi::new(transport(&server, None));
        let ticket = api.reattempt(&"es 1".into()).await.unwrap();
        assert_eq!(ticket.attempt_id.as_str(), "91");
    }

    #[tokio::test]
    async fn unauthorized_and_missing_routes() {
        let server = MockServer::start().await;
        Mock::given(path("/api/user/attempts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = ExamApi::new(transport(&server, None));
        assert!(api
            .user_attempts(AttemptsRoute::Primary)
            .await
            .unwrap_err()
            .is_auth());
        // Nothing mounted for the fallback route; wiremock answers 404.
        assert!(api
            .user_attempts(AttemptsRoute::Fallback)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn connection_failure_is_network_error() {
        let transport = HttpTransport::new(
            "http://127.0.0.1:1",
            None,
            EndpointPaths::default(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = transport.send(&Endpoint::UserAttempts).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn base_path_is_kept() {
        let transport = HttpTransport::new(
            "https://exams.example.com/backend/",
            None,
            EndpointPaths::default(),
            Duration::from_secs(1),
        )
        .unwrap();
        let url = transport
            .url_for(&Endpoint::Solutions {
                attempt_id: "a/b".into(),
                language: Some("en".into()),
            })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://exams.example.com/backend/api/attempts/a%2Fb/solutions?language=en"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpTransport::new(
            "not a url",
            None,
            EndpointPaths::default(),
            Duration::from_secs(1)
        )
        .is_err());
    }
}
