//! sitesync CLI - queue site mutations offline and sync them later
//!
//! Every command works against the local queue database; only `sync` and
//! `watch` talk to the server.

mod cli;
mod commands;
mod config_profiles;
mod error;


use std::path::Path;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::device::run_device;
use crate::commands::enqueue::run_enqueue;
use crate::commands::list::{run_conflicts, run_list, run_status};
use crate::commands::manage::{run_discard, run_prune, run_resolve, run_retry};
use crate::commands::sync::{run_sync, run_watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "sitesync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();
    match cli.command {
        Commands::Config { command } => run_config(command, profile),
        command => run_queue_command(command, profile, &resolve_db_path(cli.db_path)?).await,
    }
}

async fn run_queue_command(
    command: Commands,
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        Commands::Enqueue {
            entity,
            op,
            payload,
            server_id,
            client_version,
        } => {
            run_enqueue(
                &entity,
                op.into(),
                payload.as_deref(),
                server_id.as_deref(),
                client_version,
                db_path,
            )
            .await
        }
        Commands::List {
            status,
            limit,
            json,
        } => run_list(status.map(Into::into), limit, json, db_path).await,
        Commands::Status { json } => run_status(json, db_path).await,
        Commands::Conflicts { json } => run_conflicts(json, db_path).await,
        Commands::Resolve {
            id,
            strategy,
            merged,
        } => run_resolve(&id, strategy.into(), merged.as_deref(), db_path).await,
        Commands::Retry { id } => run_retry(&id, db_path).await,
        Commands::Discard { id } => run_discard(&id, db_path).await,
        Commands::Prune { days } => run_prune(days, db_path).await,
        Commands::Sync { json } => run_sync(json, profile, db_path).await,
        Commands::Watch {
            interval,
            probe_interval,
        } => run_watch(interval, probe_interval, profile, db_path).await,
        Commands::Device => run_device(db_path).await,
        Commands::Config { command } => run_config(command, profile),
    }
}
