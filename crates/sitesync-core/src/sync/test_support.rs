//! Scripted transports for engine and driver tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::transport::{SyncTransport, TransportError, TransportResult};
use crate::models::{AppliedChange, ServerId, SyncRequest, SyncResponse};

type Responder = Box<dyn Fn(&SyncRequest) -> TransportResult<SyncResponse> + Send + Sync>;

/// Records every request and answers with a closure
pub struct ScriptedTransport {
    requests: Mutex<Vec<SyncRequest>>,
    respond: Responder,
}

impl ScriptedTransport {
    pub fn new(
        respond: impl Fn(&SyncRequest) -> TransportResult<SyncResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Server that applies every change, numbering server ids from 500
    pub fn applying_all() -> Self {
        Self::new(|request| {
            Ok(SyncResponse {
                applied: request
                    .changes
                    .iter()
                    .zip(500_i64..)
                    .map(|(change, id)| AppliedChange {
                        offline_id: change.offline_id.clone(),
                        server_id: change.server_id.clone().unwrap_or(ServerId::Number(id)),
                        new_version: change.client_version.unwrap_or(0) + 1,
                    })
                    .collect(),
                ..SyncResponse::default()
            })
        })
    }

    /// Server that answers with no classifications at all
    pub fn empty() -> Self {
        Self::new(|_| Ok(SyncResponse::default()))
    }

    pub fn unreachable() -> Self {
        Self::new(|_| Err(TransportError::Api("HTTP 503".to_string())))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        (self.respond)(request)
    }
}

/// Holds each exchange open until the test releases it
pub struct GatedTransport {
    pub inner: ScriptedTransport,
    pub started: Notify,
    pub release: Notify,
}

impl GatedTransport {
    pub fn new(inner: ScriptedTransport) -> Self {
        Self {
            inner,
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl SyncTransport for GatedTransport {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.exchange(request).await
    }
}
