//! Request pipeline for the portal backend.
//!
//! Every call is a single attempt. The pipeline injects the bearer token and a
//! JSON content type, and normalizes the response into an [`ApiResponse`] or an
//! [`ApiError`]. Retrying is left to the caller.

use crate::error::FALLBACK_MESSAGE;
use portal_config_and_utils::Config;
use portal_storage::TokenStore;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
pub use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Request pipeline error.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, timeout, ...)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status
    #[error("HTTP {status}")]
    Status { status: u16, data: Option<Value> },

    /// The endpoint could not be joined to the base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error body, when the backend answered with one.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Status { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// User-visible message for this error.
    ///
    /// Looks at `detail`, `error` and `message` in that order, then at the
    /// first field validation error, then falls back to a generic message.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { data, .. } => data
                .as_ref()
                .and_then(extract_message)
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            ApiError::Transport(_) => "Unable to reach the server".to_string(),
            ApiError::InvalidUrl(_) => self.to_string(),
        }
    }
}

fn first_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn extract_message(data: &Value) -> Option<String> {
    let object = data.as_object()?;

    for key in ["detail", "error", "message"] {
        if let Some(text) = object.get(key).and_then(first_text) {
            return Some(text.to_string());
        }
    }

    object.iter().find_map(|(field, value)| {
        let text = first_text(value)?;
        if field == "non_field_errors" {
            Some(text.to_string())
        } else {
            Some(format!("{}: {}", field, text))
        }
    })
}

/// A single request through the pipeline.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub body: Option<Value>,
    /// Extra headers. A `Content-Type` here replaces the JSON default.
    pub headers: Vec<(String, String)>,
    /// Whether to attach the stored bearer token.
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            authenticated: true,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    pub fn put(body: Value) -> Self {
        Self::new(Method::PUT).with_body(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::new(Method::PATCH).with_body(body)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send without the stored bearer token.
    ///
    /// Used for the login and registration endpoints: a stale token would
    /// make the backend reject an otherwise anonymous request.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    fn overrides_content_type(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
    }
}

/// Response body after content-type based parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ApiBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The body as a JSON value. Text bodies become JSON strings.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ApiBody::Json(v) => Some(v),
            ApiBody::Text(s) => Some(Value::String(s)),
            ApiBody::Empty => None,
        }
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ApiBody,
}

impl ApiResponse {
    pub fn json(&self) -> Option<&Value> {
        self.body.as_json()
    }

    pub fn into_value(self) -> Value {
        self.body.into_value().unwrap_or(Value::Null)
    }
}

/// HTTP client for the portal REST API.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: &Url, tokens: Arc<TokenStore>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            timeout: None,
            tokens,
        }
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &Config, tokens: Arc<TokenStore>) -> portal_config_and_utils::CoreResult<Self> {
        let base_url = config.api_base_url()?;
        Ok(Self::new(&base_url, tokens).with_timeout(config.request_timeout()))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let joined = if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    /// Issue one request against `endpoint` (relative to the base URL).
    pub async fn call(&self, endpoint: &str, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint_url(endpoint)?;
        let method = request.method.clone();

        let mut builder = self.http_client.request(method.clone(), url);

        if !request.overrides_content_type() {
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        }
        if request.authenticated {
            if let Some(token) = self.tokens.bearer_token() {
                builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %method, endpoint, error = %e, "API request failed without a response");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE));

        let body = match response.text().await {
            Ok(text) => parse_body(&text, is_json),
            Err(e) => {
                debug!(endpoint, error = %e, "Failed to read response body");
                ApiBody::Empty
            }
        };

        debug!(
            method = %method,
            endpoint,
            status = status.as_u16(),
            "API request completed"
        );

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                data: body.into_value(),
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn parse_body(text: &str, is_json: bool) -> ApiBody {
    if text.trim().is_empty() {
        return ApiBody::Empty;
    }
    if !is_json {
        return ApiBody::Text(text.to_string());
    }
    match serde_json::from_str(text) {
        Ok(value) => ApiBody::Json(value),
        Err(e) => {
            debug!(error = %e, "Response claimed JSON but did not parse");
            ApiBody::Empty
        }
    }
}
