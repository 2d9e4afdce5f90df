//! Sync exchange transport.
//!
//! The engine talks to the server through [`SyncTransport`] so the HTTP client
//! can be swapped for a scripted one in tests or an embedded host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{SyncRequest, SyncResponse};
use crate::util::{compact_text, is_http_url, normalize_text_option, trim_trailing_slash};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid sync transport configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync API error: {0}")]
    Api(String),
    #[error("Sync request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid sync response payload: {0}")]
    InvalidPayload(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One request/response exchange with the sync server
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse>;
}

#[async_trait]
impl<T: SyncTransport + ?Sized> SyncTransport for Arc<T> {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse> {
        (**self).exchange(request).await
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint: String,
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TransportConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// JSON-over-HTTP transport: POSTs the batch to the sync endpoint
#[derive(Clone)]
pub struct HttpSyncTransport {
    endpoint: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpSyncTransport {
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        let endpoint = normalize_endpoint(config.endpoint)?;
        Ok(Self {
            endpoint,
            auth_token: normalize_text_option(config.auth_token),
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api(parse_api_error(status, &body)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|error| TransportError::InvalidPayload(error.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let compact = compact_text(body);
    if compact.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact, status.as_u16())
    }
}

pub(crate) fn normalize_endpoint(raw: String) -> TransportResult<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        TransportError::InvalidConfiguration("endpoint must not be empty".to_string())
    })?;
    if is_http_url(&endpoint) {
        Ok(trim_trailing_slash(&endpoint))
    } else {
        Err(TransportError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
