use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gridscout_core::models::HttpMethod;
use gridscout_core::Collection;

#[derive(Parser)]
#[command(name = "gridscout")]
#[command(about = "Inspect and register electrical distribution assets from the field")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Treat the remote system as unreachable; reads come from the mirror
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one sync cycle: pull all collections, then drain the queue
    Sync,
    /// Clear pull watermarks and run a full re-sync (reconciles deletions)
    Resync,
    /// Inspect or edit the mutation queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// List assets, from the remote system or the local mirror
    List {
        /// Collection to list
        #[arg(value_enum)]
        collection: CollectionArg,
        /// Exact region (transformers and inspections resolve it via their
        /// base station)
        #[arg(long)]
        region: Option<String>,
        /// Station code
        #[arg(long)]
        station: Option<String>,
        /// Case-insensitive fragment of the collection's descriptive field
        #[arg(long)]
        contains: Option<String>,
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u64,
        /// Records per page
        #[arg(long, default_value = "50")]
        page_size: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued mutations with status and accumulated errors
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Queue a mutation for delivery on the next sync cycle
    Add {
        /// Remote resource endpoint (e.g. /inspections/)
        endpoint: String,
        /// HTTP method
        #[arg(value_enum)]
        method: MethodArg,
        /// Human label shown when inspecting the queue
        #[arg(long)]
        title: String,
        /// JSON payload (omit for DELETE)
        #[arg(long)]
        payload: Option<String>,
    },
    /// Discard a queued mutation, regardless of its delivery status
    Remove {
        /// Queue item id
        id: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CollectionArg {
    Stations,
    Transformers,
    Inspections,
    Feeders,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Stations => Self::BaseStations,
            CollectionArg::Transformers => Self::Transformers,
            CollectionArg::Inspections => Self::Inspections,
            CollectionArg::Feeders => Self::Feeders,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum MethodArg {
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MethodArg> for HttpMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Post => Self::Post,
            MethodArg::Put => Self::Put,
            MethodArg::Patch => Self::Patch,
            MethodArg::Delete => Self::Delete,
        }
    }
}
