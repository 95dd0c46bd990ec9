//! Transport seam between the browser components and the REST backend.
//!
//! Every component talks to the `Backend` trait; `HttpBackend` is the
//! production implementation (reqwest + bearer token from the `Session`).

use std::sync::Arc;

use async_trait::async_trait;
use cashper_auth::{AuthError, Session};
use serde_json::Value;

use crate::config::AdminConfig;
use crate::error::ClientError;

/// HTTP method for mutating requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Put,
    Patch,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Post => "POST",
        }
    }
}

/// Authenticated access to the admin REST API.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET path?query` returning the decoded JSON body.
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ClientError>;

    /// Send a JSON body with `method`; an empty response body decodes as `Value::Null`.
    async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<Value, ClientError>;

    /// `GET path` returning the raw body (document downloads).
    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
impl<B> Backend for Arc<B>
where
    B: Backend + ?Sized,
{
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
        (**self).get_json(path, query).await
    }

    async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<Value, ClientError> {
        (**self).send_json(method, path, body).await
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        (**self).get_bytes(path).await
    }
}

/// reqwest-backed implementation.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            session,
        }
    }

    /// Build from configuration, applying the optional request timeout.
    pub fn from_config(config: &AdminConfig, session: Session) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let token = self.session.bearer()?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.session.handle_unauthorized();
            return Err(AuthError::Unauthorized.into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), &body));
        }
        Ok(resp)
    }

    async fn decode(resp: reqwest::Response) -> Result<Value, ClientError> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
        let url = self.url(path);
        tracing::debug!(%url, ?query, "GET");
        let resp = self.execute(self.client.get(&url).query(query)).await?;
        Self::decode(resp).await
    }

    async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<Value, ClientError> {
        let url = self.url(path);
        tracing::debug!(%url, method = method.as_str(), "sending");
        let req = match method {
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Post => self.client.post(&url),
        };
        let resp = self.execute(req.json(body)).await?;
        Self::decode(resp).await
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET (binary)");
        let resp = self.execute(self.client.get(&url)).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
