use std::io;

use sitesync_core::sync::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] sitesync_core::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Entity name cannot be empty")]
    EmptyEntity,
    #[error("Offline ID cannot be empty")]
    EmptyOfflineId,
    #[error("No queue item matches id/prefix: {0}")]
    ItemNotFound(String),
    #[error("{0}")]
    AmbiguousOfflineId(String),
    #[error("Invalid payload JSON: {0}")]
    InvalidPayload(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error(
        "Sync is not configured. Run `sitesync config init --endpoint <URL>` or set SITESYNC_ENDPOINT."
    )]
    SyncNotConfigured,
}
