use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sitesync_core::sync::ConflictStrategy;
use sitesync_core::{Operation, QueueStatus};

#[derive(Parser)]
#[command(name = "sitesync")]
#[command(about = "Record site mutations offline and sync them when back online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local queue database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a mutation for the next sync
    #[command(alias = "add")]
    Enqueue {
        /// Entity kind (e.g. permit, incident, worker)
        entity: String,
        /// Operation
        #[arg(value_enum)]
        op: OpArg,
        /// JSON payload (read from stdin when omitted)
        payload: Option<String>,
        /// Server id of the record being updated or deleted
        #[arg(long, value_name = "ID")]
        server_id: Option<String>,
        /// Version the local edit was based on
        #[arg(long, value_name = "VERSION")]
        client_version: Option<i64>,
    },
    /// List queued items
    List {
        /// Only show items with this status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue counts and last sync time
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List items waiting for a conflict decision
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflicted item
    Resolve {
        /// Offline ID or unique ID prefix
        id: String,
        /// Resolution strategy
        #[arg(value_enum)]
        strategy: StrategyArg,
        /// Merged JSON payload (required for `merge`)
        #[arg(long, value_name = "JSON")]
        merged: Option<String>,
    },
    /// Resubmit a failed item
    Retry {
        /// Offline ID or unique ID prefix
        id: String,
    },
    /// Drop a queued item
    Discard {
        /// Offline ID or unique ID prefix
        id: String,
    },
    /// Remove synced items past the retention window
    Prune {
        /// Retention in days
        #[arg(long, default_value = "7")]
        days: u64,
    },
    /// Run one sync cycle now
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the foreground until interrupted
    Watch {
        /// Seconds between periodic sync attempts
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Seconds between reachability probes
        #[arg(long, value_name = "SECS", default_value = "10")]
        probe_interval: u64,
    },
    /// Print this install's device id
    Device,
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OpArg {
    Create,
    Update,
    Delete,
}

impl From<OpArg> for Operation {
    fn from(value: OpArg) -> Self {
        match value {
            OpArg::Create => Self::Create,
            OpArg::Update => Self::Update,
            OpArg::Delete => Self::Delete,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Synced,
    Conflict,
    Failed,
}

impl From<StatusArg> for QueueStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Self::Pending,
            StatusArg::Synced => Self::Synced,
            StatusArg::Conflict => Self::Conflict,
            StatusArg::Failed => Self::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    UseRemote,
    KeepLocal,
    Merge,
}

impl From<StrategyArg> for ConflictStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::UseRemote => Self::UseRemote,
            StrategyArg::KeepLocal => Self::KeepLocal,
            StrategyArg::Merge => Self::Merge,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Sync endpoint URL
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
        /// Bearer token sent with sync requests
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
        /// Seconds between periodic sync attempts in `watch`
        #[arg(long, value_name = "SECS")]
        auto_sync_interval: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show,
}
