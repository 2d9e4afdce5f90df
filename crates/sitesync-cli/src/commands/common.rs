use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sitesync_core::store::LibSqlQueueStore;
use sitesync_core::sync::{
    ConnectivityMonitor, HttpSyncTransport, OfflineQueue, SyncEngine, SyncOutcome,
};
use sitesync_core::{OfflineId, QueueItem, SyncService};

use crate::config_profiles::{CliProfilesConfig, ResolvedSync};
use crate::error::CliError;

pub type CliEngine = SyncEngine<LibSqlQueueStore, HttpSyncTransport>;

#[derive(Debug, Serialize)]
pub struct QueueListItem {
    pub offline_id: String,
    pub entity: String,
    pub op: String,
    pub status: String,
    pub server_id: Option<String>,
    pub client_version: Option<i64>,
    pub attempts: u32,
    pub created_at: i64,
    pub relative_time: String,
    pub error: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct ConflictItem {
    pub offline_id: String,
    pub entity: String,
    pub server_id: String,
    pub server_version: i64,
    pub server_data: Value,
    pub local_data: Value,
}

pub async fn open_service(db_path: &Path) -> Result<SyncService, CliError> {
    Ok(SyncService::open_path(db_path.to_path_buf()).await?)
}

pub fn resolve_sync_settings(profile: Option<&str>) -> Result<ResolvedSync, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    config
        .resolve_sync(profile)
        .ok_or(CliError::SyncNotConfigured)
}

/// Build an engine over the service queue.
///
/// `online` seeds the connectivity monitor: one-shot syncs start online and
/// report a failed exchange as an aborted cycle, `watch` starts offline and
/// waits for the reachability probe.
pub fn build_engine(
    service: &SyncService,
    resolved: &ResolvedSync,
    online: bool,
) -> Result<CliEngine, CliError> {
    let transport = HttpSyncTransport::new(resolved.transport.clone())?;
    let connectivity = ConnectivityMonitor::default();
    connectivity.set_online(online);
    tracing::debug!(
        "Using sync profile '{}' ({})",
        resolved.profile_name,
        transport.endpoint()
    );
    Ok(service.engine(transport, connectivity, resolved.engine.clone()))
}

/// Resolve a full offline id or a unique prefix of one.
pub async fn resolve_offline_id<S: sitesync_core::store::QueueStore>(
    query: &str,
    queue: &OfflineQueue<S>,
) -> Result<OfflineId, CliError> {
    let query = normalize_offline_identifier(query)?;
    let items = queue.items().await;

    if let Some(item) = items.iter().find(|item| item.offline_id.as_str() == query) {
        return Ok(item.offline_id.clone());
    }

    let matching = items
        .iter()
        .filter(|item| item.offline_id.as_str().starts_with(&query))
        .map(|item| item.offline_id.clone())
        .take(3)
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::ItemNotFound(query)),
        [only] => Ok(only.clone()),
        _ => {
            let options = matching
                .iter()
                .map(|id| short_id(id.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousOfflineId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_offline_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyOfflineId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_json_payload(raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw.trim()).map_err(|error| CliError::InvalidPayload(error.to_string()))
}

/// Payload from the argument, piped stdin, or an empty object.
pub fn resolve_payload(raw: Option<&str>) -> Result<Value, CliError> {
    if let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) {
        return parse_json_payload(raw);
    }

    if let Some(piped) = read_piped_stdin()? {
        return parse_json_payload(&piped);
    }

    Ok(Value::Object(serde_json::Map::new()))
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

pub fn payload_preview(payload: &Value, max_chars: usize) -> String {
    let rendered = payload.to_string();
    if rendered.chars().count() <= max_chars {
        rendered
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = rendered.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_queue_lines(items: &[QueueItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let short_id = short_id(item.offline_id.as_str());
            let label = format!("{} {}", item.op, item.entity);
            let relative_time = format_relative_time(item.created_at, now_ms);
            let preview = payload_preview(&item.payload, 40);
            match &item.error {
                Some(error) => format!(
                    "{short_id:<12}  {:<8}  {label:<20}  {relative_time:<10}  {preview}  ({error})",
                    item.status.to_string()
                ),
                None => format!(
                    "{short_id:<12}  {:<8}  {label:<20}  {relative_time:<10}  {preview}",
                    item.status.to_string()
                ),
            }
        })
        .collect()
}

pub fn queue_item_to_list_item(item: &QueueItem) -> QueueListItem {
    let now_ms = Utc::now().timestamp_millis();
    QueueListItem {
        offline_id: item.offline_id.to_string(),
        entity: item.entity.clone(),
        op: item.op.to_string(),
        status: item.status.to_string(),
        server_id: item.server_id.as_ref().map(ToString::to_string),
        client_version: item.client_version,
        attempts: item.attempts,
        created_at: item.created_at,
        relative_time: format_relative_time(item.created_at, now_ms),
        error: item.error.clone(),
        payload: item.payload.clone(),
    }
}

pub fn conflict_to_item(item: &QueueItem) -> Option<ConflictItem> {
    let conflict = item.conflict.as_ref()?;
    Some(ConflictItem {
        offline_id: item.offline_id.to_string(),
        entity: item.entity.clone(),
        server_id: conflict.server_id.to_string(),
        server_version: conflict.server_version,
        server_data: conflict.server_data.clone(),
        local_data: conflict.local_data.clone(),
    })
}

pub fn format_conflict_lines(items: &[QueueItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            let conflict = item.conflict.as_ref()?;
            Some(format!(
                "{:<12}  {} {}  server={} v{}  local={}  remote={}",
                short_id(item.offline_id.as_str()),
                item.op,
                item.entity,
                conflict.server_id,
                conflict.server_version,
                payload_preview(&conflict.local_data, 30),
                payload_preview(&conflict.server_data, 30)
            ))
        })
        .collect()
}

pub fn format_sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Skipped { reason } => format!("Sync skipped: {reason}"),
        SyncOutcome::Completed(report) => format!(
            "Sync completed: {} sent, {} applied, {} conflicts, {} rejected, {} deferred",
            report.sent, report.applied, report.conflicts, report.rejected, report.deferred
        ),
        SyncOutcome::Aborted { reason } => format!("Sync aborted: {reason}"),
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("SITESYNC_DB_PATH").map(PathBuf::from))
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("sitesync").join("sitesync.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}
