use std::path::Path;

use sitesync_core::QueueStatus;

use crate::commands::common::{
    conflict_to_item, format_conflict_lines, format_queue_lines, format_sync_timestamp,
    open_service, queue_item_to_list_item, ConflictItem, QueueListItem,
};
use crate::error::CliError;

pub async fn run_list(
    status: Option<QueueStatus>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let items = match status {
        Some(status) => service.queue().list_by_status(status).await,
        None => service.queue().items().await,
    };
    let items = items.into_iter().take(limit).collect::<Vec<_>>();

    if as_json {
        let json_items = items
            .iter()
            .map(queue_item_to_list_item)
            .collect::<Vec<QueueListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let status = service.queue().status();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("pending:   {}", status.pending);
    println!("conflicts: {}", status.conflicts);
    println!("failed:    {}", status.failed);
    println!("synced:    {}", status.synced);
    println!(
        "last sync: {}",
        status
            .last_sync_at
            .map_or_else(|| "never".to_string(), format_sync_timestamp)
    );
    Ok(())
}

pub async fn run_conflicts(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let conflicts = service.queue().list_conflicts().await;

    if as_json {
        let json_items = conflicts
            .iter()
            .filter_map(conflict_to_item)
            .collect::<Vec<ConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts waiting for a decision.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
