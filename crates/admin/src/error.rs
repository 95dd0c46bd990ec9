//! Client-side error taxonomy.

use cashper_auth::AuthError;
use cashper_core::DomainError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or rejected credentials.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response. `detail` is the server-provided reason when available.
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// The response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Local validation rejected the operation before any request was sent.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The server answered 2xx but reported the operation as unsuccessful.
    #[error("{0}")]
    Rejected(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build an `Api` error from a response status and raw body.
    ///
    /// Recognizes `{"detail": "..."}`, `{"detail": [{"msg": "..."}]}`,
    /// `{"message": "..."}` and `{"error": "..."}` bodies.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| extract_detail(&v))
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && trimmed.len() <= 512).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Self::Api { status, detail }
    }

    /// Message suitable for a toast: server reason verbatim for API errors.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ClientError::Auth(AuthError::Unauthorized | AuthError::MissingToken)
        )
    }
}

fn extract_detail(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    for key in ["detail", "message", "error"] {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_surfaced_verbatim() {
        let err = ClientError::from_response(400, r#"{"detail":"Loan already disbursed"}"#);
        assert_eq!(err.user_message(), "Loan already disbursed");
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
    }

    #[test]
    fn validation_detail_lists_are_joined() {
        let body = r#"{"detail":[{"loc":["body","status"],"msg":"field required"},{"msg":"bad value"}]}"#;
        let err = ClientError::from_response(422, body);
        assert_eq!(err.user_message(), "field required; bad value");
    }

    #[test]
    fn falls_back_to_plain_text_then_status() {
        assert_eq!(
            ClientError::from_response(502, "Bad Gateway").user_message(),
            "Bad Gateway"
        );
        assert_eq!(
            ClientError::from_response(500, "").user_message(),
            "request failed with status 500"
        );
    }

    #[test]
    fn unauthorized_classification() {
        assert!(ClientError::from(AuthError::Unauthorized).is_unauthorized());
        assert!(!ClientError::Network("down".into()).is_unauthorized());
    }
}
