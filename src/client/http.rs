//! Issuing a resolved request and buffering the response
//!
//! The runner only sees the [`HttpTransport`] trait; [`ReqwestTransport`] is
//! the implementation used by the CLI.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use crate::errors::ChainprobeError;

pub const USER_AGENT_STRING: &str = concat!("chainprobe/", env!("CARGO_PKG_VERSION"));

/// A request with every placeholder already substituted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedRequest {
    pub method: String,
    pub url: String,
    /// Header pairs in send order; later pairs replace earlier ones with the same name
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
}

/// Fully buffered response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    /// Status line without the protocol, e.g. `200 OK`
    pub status: String,
    pub body: Bytes,
}

/// Failure to obtain a response at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Executes one HTTP exchange
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn execute(&self, request: &ResolvedRequest) -> Result<TransportResponse, TransportError>;
}

/// Render a status code the way it appears on the status line
///
/// `reason` is the phrase the server sent, present only when it differs from
/// the canonical one.
pub fn format_status_line(status: StatusCode, reason: Option<&[u8]>) -> String {
    let custom = reason
        .map(String::from_utf8_lossy)
        .filter(|r| !r.trim().is_empty());

    match (custom, status.canonical_reason()) {
        (Some(reason), _) => format!("{} {}", status.as_u16(), reason.trim()),
        (None, Some(reason)) => format!("{} {}", status.as_u16(), reason),
        (None, None) => status.as_u16().to_string(),
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client; `timeout` bounds each whole exchange
    pub fn new(timeout: Option<Duration>) -> Result<Self, ChainprobeError> {
        let mut builder = Client::builder().user_agent(USER_AGENT_STRING);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ChainprobeError::Request)?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_headers(request: &ResolvedRequest) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ResolvedRequest) -> Result<TransportResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidMethod(request.method.clone()))?;
        let headers = Self::build_headers(request)?;

        let mut builder = self.client.request(method, &request.url).headers(headers);
        if let Some(ref body) = request.body {
            let payload = serde_json::to_vec(body)
                .map_err(|e| TransportError::Request(format!("Invalid JSON body: {}", e)))?;
            builder = builder.body(payload);
        }

        debug!(method = %request.method, url = %request.url, "Sending request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|r| r.as_bytes());
        let status = format_status_line(response.status(), reason);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
