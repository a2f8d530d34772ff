// ===============================
// src/error.rs
// ===============================
use thiserror::Error;

/// Uniform error surfaced by every repository / service call.
///
/// The CLI (and any UI on top of the library) shows `to_string()` and the
/// optional `status()`; local state is left untouched on error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No connectivity, DNS, TLS or timeout while talking to the backend.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Backend answered with a 4xx/5xx.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// Body could not be decoded into the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// Rejected client-side, nothing was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no open cash session for store {0}")]
    NoOpenSession(i64),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Build an `Http` error from a status and the raw response body.
    ///
    /// Backends answer either `{"message": ".."}`, `{"error": ".."}` or plain
    /// text; an empty body falls back to the canonical reason phrase.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["message", "error", "detail"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        ApiError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Parse(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::Config(format!("bad url: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn message_is_taken_from_json_body() {
        let e = ApiError::from_response(
            StatusCode::CONFLICT,
            r#"{"message":"cashbox already open for store 1"}"#,
        );
        assert_eq!(e.status(), Some(409));
        assert!(e.is_conflict());
        assert_eq!(e.to_string(), "http 409: cashbox already open for store 1");
    }

    #[test]
    fn error_field_and_plain_text_bodies() {
        let e = ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"error":"bad amount"}"#);
        assert_eq!(e.to_string(), "http 400: bad amount");

        let e = ApiError::from_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(e.to_string(), "http 502: upstream down");
    }

    #[test]
    fn empty_body_uses_reason_phrase() {
        let e = ApiError::from_response(StatusCode::NOT_FOUND, "");
        assert_eq!(e.to_string(), "http 404: Not Found");
    }

    #[test]
    fn client_side_errors_have_no_status() {
        assert_eq!(ApiError::Validation("x".into()).status(), None);
        assert_eq!(ApiError::NoOpenSession(3).status(), None);
        assert_eq!(
            ApiError::NoOpenSession(3).to_string(),
            "no open cash session for store 3"
        );
    }
}
