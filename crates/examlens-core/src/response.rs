//! Validation of raw backend responses.

use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// What the fetch layer hands to the core: status, content type and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// A 200 response with an `application/json` content type.
    pub fn json(body: impl Into<String>) -> Self {
        Self::new(200, Some("application/json"), body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// `application/json`, ignoring case and any parameters such as charset.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Check status and content type, then decode the body as `T`.
///
/// The status is checked first so that an HTML 401 page still reports
/// `Auth` rather than `Shape`.
pub fn validate_json<T: DeserializeOwned>(
    endpoint: &str,
    response: &RawResponse,
) -> Result<T, FetchError> {
    match response.status {
        401 => {
            return Err(FetchError::Auth {
                endpoint: endpoint.to_string(),
            })
        }
        404 => {
            return Err(FetchError::NotFound {
                endpoint: endpoint.to_string(),
            })
        }
        status if status >= 400 => {
            return Err(FetchError::Api {
                endpoint: endpoint.to_string(),
                status,
                message: truncate(&response.body, 200),
            })
        }
        _ => {}
    }

    match response.content_type.as_deref() {
        Some(ct) if is_json_content_type(ct) => {}
        other => {
            return Err(FetchError::shape(
                endpoint,
                format!("expected application/json, got {}", other.unwrap_or("no content type")),
            ))
        }
    }

    serde_json::from_str(&response.body)
        .map_err(|e| FetchError::shape(endpoint, format!("invalid JSON: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn json_content_type_variants() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(!is_json_content_type("text/html"));
        assert!(!is_json_content_type("application/jsonp"));
    }

    #[test]
    fn html_body_is_shape_error() {
        let response = RawResponse::new(200, Some("text/html"), "<html>oops</html>");
        let err = validate_json::<Value>("analysis", &response).unwrap_err();
        assert!(matches!(err, FetchError::Shape { .. }));
    }

    #[test]
    fn missing_content_type_is_shape_error() {
        let response = RawResponse::new(200, None, "{}");
        assert!(matches!(
            validate_json::<Value>("analysis", &response),
            Err(FetchError::Shape { .. })
        ));
    }

    #[test]
    fn status_takes_precedence_over_content_type() {
        let unauthorized = RawResponse::new(401, Some("text/html"), "login");
        assert!(validate_json::<Value>("x", &unauthorized).unwrap_err().is_auth());

        let missing = RawResponse::new(404, Some("text/html"), "");
        assert!(validate_json::<Value>("x", &missing).unwrap_err().is_not_found());

        let broken = RawResponse::new(502, Some("text/plain"), "bad gateway");
        assert_eq!(
            validate_json::<Value>("x", &broken).unwrap_err(),
            FetchError::Api {
                endpoint: "x".into(),
                status: 502,
                message: "bad gateway".into(),
            }
        );
    }

    #[test]
    fn wrong_schema_is_shape_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Ticket {
            #[allow(dead_code)]
            attempt_id: String,
        }
        let response = RawResponse::json(r#"{"other": 1}"#);
        let err = validate_json::<Ticket>("reattempt", &response).unwrap_err();
        assert!(matches!(err, FetchError::Shape { .. }));
        assert!(err.to_string().contains("reattempt"));
    }

    #[test]
    fn decodes_valid_body() {
        let value: Value = validate_json("x", &RawResponse::json(r#"{"a": 1}"#)).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(500);
        let response = RawResponse::new(500, Some("text/plain"), body);
        match validate_json::<Value>("x", &response) {
            Err(FetchError::Api { message, .. }) => assert_eq!(message.len(), 203),
            other => panic!("unexpected {other:?}"),
        }
    }
}
