//! Sync exchange payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::device::DeviceId;
use super::queue_item::{ConflictRecord, OfflineId, Operation, QueueItem, ServerId};

/// Outbound batch of pending mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub device_id: DeviceId,
    pub client_time: DateTime<Utc>,
    pub changes: Vec<ChangeRecord>,
}

/// Transmissible subset of a queue item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entity: String,
    pub op: Operation,
    pub offline_id: OfflineId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ServerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<i64>,
    pub data: Value,
}

impl From<&QueueItem> for ChangeRecord {
    fn from(item: &QueueItem) -> Self {
        Self {
            entity: item.entity.clone(),
            op: item.op,
            offline_id: item.offline_id.clone(),
            server_id: item.server_id.clone(),
            client_version: item.client_version,
            data: item.payload.clone(),
        }
    }
}

/// Per-item classification returned by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub applied: Vec<AppliedChange>,
    #[serde(default)]
    pub conflicts: Vec<ConflictedChange>,
    #[serde(default)]
    pub rejected: Vec<RejectedChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub offline_id: OfflineId,
    pub server_id: ServerId,
    pub new_version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictedChange {
    pub offline_id: OfflineId,
    pub server_id: ServerId,
    pub server_version: i64,
    #[serde(default)]
    pub server_data: Value,
    #[serde(default)]
    pub local_data: Value,
}

impl ConflictedChange {
    /// Split into the addressed item id and the record stored on it
    pub fn into_record(self) -> (OfflineId, ConflictRecord) {
        (
            self.offline_id,
            ConflictRecord {
                server_id: self.server_id,
                server_version: self.server_version,
                server_data: self.server_data,
                local_data: self.local_data,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedChange {
    pub offline_id: OfflineId,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mutation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn change_record_omits_absent_optionals() {
        let item = QueueItem::from_mutation(Mutation::create("permit", json!({"title": "A"})), 0);
        let value = serde_json::to_value(ChangeRecord::from(&item)).unwrap();

        assert_eq!(
            value,
            json!({
                "entity": "permit",
                "op": "create",
                "offline_id": item.offline_id.as_str(),
                "data": {"title": "A"},
            })
        );
    }

    #[test]
    fn response_buckets_default_to_empty() {
        let response: SyncResponse =
            serde_json::from_str(r#"{"applied":[{"offline_id":"off_1","server_id":501,"new_version":1}]}"#)
                .unwrap();

        assert_eq!(response.applied.len(), 1);
        assert_eq!(response.applied[0].server_id, ServerId::Number(501));
        assert!(response.conflicts.is_empty());
        assert!(response.rejected.is_empty());
    }

    #[test]
    fn conflicted_change_keeps_payloads_verbatim() {
        let change: ConflictedChange = serde_json::from_value(json!({
            "offline_id": "off_2",
            "server_id": "srv-2",
            "server_version": 7,
            "server_data": {"title": "remote"},
            "local_data": {"title": "local"},
        }))
        .unwrap();

        let (offline_id, record) = change.into_record();
        assert_eq!(offline_id.as_str(), "off_2");
        assert_eq!(record.server_version, 7);
        assert_eq!(record.server_data, json!({"title": "remote"}));
        assert_eq!(record.local_data, json!({"title": "local"}));
    }
}
