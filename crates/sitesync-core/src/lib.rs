//! sitesync-core - offline mutation queue for field data capture
//!
//! Mutations recorded while disconnected are persisted in a local libSQL
//! database and reconciled with the server once connectivity returns, using
//! optimistic concurrency on a per-item version.

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use models::{Mutation, OfflineId, Operation, QueueItem, QueueStatus, ServerId};
pub use services::SyncService;
pub use state::{SyncPhase, SyncStatus};
