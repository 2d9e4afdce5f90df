//! Error types for sitesync-core

use thiserror::Error;

use crate::models::OfflineId;

/// Result type alias using sitesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sitesync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The queue snapshot could not be persisted
    #[error("Storage error: {0}")]
    Storage(String),

    /// No queue item with this offline id
    #[error("Queue item not found: {0}")]
    NotFound(OfflineId),

    /// Conflict resolution requested for an item without a stored conflict
    #[error("Queue item {0} is not in conflict")]
    NotInConflict(OfflineId),

    /// Resubmission requested for an item that has not failed
    #[error("Queue item {0} has not failed")]
    NotFailed(OfflineId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
