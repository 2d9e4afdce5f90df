//! Queue item model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

const OFFLINE_ID_PREFIX: &str = "off_";

/// Client-generated identifier of one offline mutation.
///
/// Assigned once at enqueue time and never reused. The server echoes it back
/// in every classification bucket of a sync response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfflineId(String);

impl OfflineId {
    /// Generate a fresh random offline id
    #[must_use]
    pub fn new() -> Self {
        Self(format!("{OFFLINE_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OfflineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OfflineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OfflineId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("offline id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Server-assigned record identity.
///
/// Servers hand out either numeric or textual ids; the original form is kept
/// so it goes back on the wire exactly as it was received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl FromStr for ServerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("server id cannot be empty".to_string()));
        }
        Ok(trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Text(trimmed.to_string()), Self::Number))
    }
}

impl From<i64> for ServerId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Kind of mutation applied to the target record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown operation: {other}"))),
        }
    }
}

/// Lifecycle state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Waiting for the next sync cycle
    Pending,
    /// Confirmed by the server
    Synced,
    /// Server reported a version mismatch; needs a user decision
    Conflict,
    /// Permanently rejected by the server
    Failed,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        })
    }
}

/// Server-side state captured when an optimistic-concurrency check fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub server_id: ServerId,
    pub server_version: i64,
    pub server_data: Value,
    pub local_data: Value,
}

/// A mutation as submitted by a caller, before it is queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub entity: String,
    pub op: Operation,
    pub payload: Value,
    pub server_id: Option<ServerId>,
    pub client_version: Option<i64>,
}

impl Mutation {
    /// Describe a mutation of `entity` with the given payload
    pub fn new(entity: impl Into<String>, op: Operation, payload: Value) -> Self {
        Self {
            entity: entity.into(),
            op,
            payload,
            server_id: None,
            client_version: None,
        }
    }

    pub fn create(entity: impl Into<String>, payload: Value) -> Self {
        Self::new(entity, Operation::Create, payload)
    }

    pub fn update(entity: impl Into<String>, payload: Value) -> Self {
        Self::new(entity, Operation::Update, payload)
    }

    pub fn delete(entity: impl Into<String>, payload: Value) -> Self {
        Self::new(entity, Operation::Delete, payload)
    }

    /// Target an existing server record
    #[must_use]
    pub fn with_server_id(mut self, server_id: impl Into<ServerId>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Base version for the optimistic-concurrency check
    #[must_use]
    pub const fn with_client_version(mut self, version: i64) -> Self {
        self.client_version = Some(version);
        self
    }
}

/// One offline mutation tracked by the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Client-generated identifier
    pub offline_id: OfflineId,
    /// Logical type of the target record
    pub entity: String,
    /// Mutation kind
    pub op: Operation,
    /// Server identity, once assigned or confirmed
    #[serde(default)]
    pub server_id: Option<ServerId>,
    /// Last server version this client reconciled against
    #[serde(default)]
    pub client_version: Option<i64>,
    /// Domain data to apply
    pub payload: Value,
    pub status: QueueStatus,
    /// Sync cycles that processed this item without reaching `synced`
    #[serde(default)]
    pub attempts: u32,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last state transition timestamp (Unix ms)
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub conflict: Option<ConflictRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueueItem {
    /// Build a fresh pending item for a submitted mutation
    pub fn from_mutation(mutation: Mutation, now: i64) -> Self {
        Self {
            offline_id: OfflineId::new(),
            entity: mutation.entity,
            op: mutation.op,
            server_id: mutation.server_id,
            client_version: mutation.client_version,
            payload: mutation.payload,
            status: QueueStatus::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
            conflict: None,
            error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueueStatus::Pending
    }

    /// Record a server-confirmed identity.
    ///
    /// Returns `false` and keeps the current value when the item already
    /// carries a different server id.
    pub fn adopt_server_id(&mut self, server_id: ServerId) -> bool {
        match &self.server_id {
            Some(existing) if *existing != server_id => false,
            _ => {
                self.server_id = Some(server_id);
                true
            }
        }
    }
}
