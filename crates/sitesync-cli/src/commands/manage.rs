use std::path::Path;
use std::time::Duration;

use sitesync_core::sync::{ConflictStrategy, Resolution};

use crate::commands::common::{open_service, parse_json_payload, resolve_offline_id};
use crate::error::CliError;

pub async fn run_resolve(
    id: &str,
    strategy: ConflictStrategy,
    merged: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let merged = merged.map(parse_json_payload).transpose()?;
    let resolution = Resolution::from_strategy(strategy, merged)?;

    let service = open_service(db_path).await?;
    let offline_id = resolve_offline_id(id, service.queue()).await?;
    let item = service
        .queue()
        .resolve_conflict(&offline_id, resolution)
        .await?;

    println!("{} {}", item.offline_id, item.status);
    Ok(())
}

pub async fn run_retry(id: &str, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let offline_id = resolve_offline_id(id, service.queue()).await?;
    let item = service.queue().retry_failed(&offline_id).await?;

    println!("{} {}", item.offline_id, item.status);
    Ok(())
}

pub async fn run_discard(id: &str, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let offline_id = resolve_offline_id(id, service.queue()).await?;
    let item = service.queue().discard(&offline_id).await?;

    println!("{}", item.offline_id);
    Ok(())
}

pub async fn run_prune(days: u64, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let retention = Duration::from_secs(days.saturating_mul(24 * 60 * 60));
    let pruned = service.queue().prune_synced(retention).await?;

    println!("Pruned {pruned} synced items");
    Ok(())
}
