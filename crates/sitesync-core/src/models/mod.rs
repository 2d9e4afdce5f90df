//! Data models for sitesync

mod device;
mod queue_item;
mod wire;

pub use device::DeviceId;
pub use queue_item::{
    ConflictRecord, Mutation, OfflineId, Operation, QueueItem, QueueStatus, ServerId,
};
pub use wire::{
    AppliedChange, ChangeRecord, ConflictedChange, RejectedChange, SyncRequest, SyncResponse,
};
