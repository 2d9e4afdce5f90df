use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sitesync_core::sync::{run_auto_sync, ReachabilityProbe, SyncOutcome};
use tokio::sync::watch;

use crate::commands::common::{
    build_engine, format_sync_outcome, open_service, resolve_sync_settings,
};
use crate::error::CliError;

pub async fn run_sync(
    as_json: bool,
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let resolved = resolve_sync_settings(profile)?;
    let service = open_service(db_path).await?;
    let engine = build_engine(&service, &resolved, true)?;

    let outcome = engine.trigger_sync().await;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", format_sync_outcome(&outcome));
    }

    match outcome {
        SyncOutcome::Aborted { reason } => Err(CliError::SyncFailed(reason)),
        SyncOutcome::Skipped { .. } | SyncOutcome::Completed(_) => Ok(()),
    }
}

pub async fn run_watch(
    interval: Option<u64>,
    probe_interval: u64,
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let mut resolved = resolve_sync_settings(profile)?;
    if let Some(secs) = interval.filter(|secs| *secs > 0) {
        resolved.engine = resolved
            .engine
            .with_auto_sync_interval(Duration::from_secs(secs));
    }

    let service = open_service(db_path).await?;
    let engine = Arc::new(build_engine(&service, &resolved, false)?);
    let probe = ReachabilityProbe::new(
        resolved.transport.endpoint.clone(),
        Duration::from_secs(probe_interval.max(1)),
    )?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let probe_task = tokio::spawn({
        let monitor = engine.connectivity().clone();
        let shutdown = shutdown_rx.clone();
        async move { probe.run(monitor, shutdown).await }
    });
    let driver_task = tokio::spawn(run_auto_sync(Arc::clone(&engine), shutdown_rx));

    println!(
        "Watching {} (profile '{}'); press Ctrl-C to stop",
        resolved.transport.endpoint, resolved.profile_name
    );
    tokio::signal::ctrl_c().await?;

    let _ = shutdown_tx.send(true);
    let _ = probe_task.await;
    let _ = driver_task.await;

    let status = engine.status();
    println!(
        "Stopped with {} pending, {} conflicts, {} failed",
        status.pending, status.conflicts, status.failed
    );
    Ok(())
}
