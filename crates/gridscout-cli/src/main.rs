//! Gridscout CLI - field client for the asset registry
//!
//! Capture inspections and asset registrations in the field, with or without
//! connectivity, and reconcile with the registry when a link is available.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands, QueueCommands};
use crate::commands::common::resolve_db_path;
use crate::commands::list::{run_list, ListOptions};
use crate::commands::queue::{run_queue_add, run_queue_list, run_queue_remove};
use crate::commands::sync::{run_resync, run_sync};
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gridscout=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let offline = cli.offline;

    match cli.command {
        Commands::Sync => run_sync(&db_path, offline).await?,
        Commands::Resync => run_resync(&db_path, offline).await?,
        Commands::Queue { command } => match command {
            QueueCommands::List { json } => run_queue_list(json, &db_path, offline).await?,
            QueueCommands::Add {
                endpoint,
                method,
                title,
                payload,
            } => {
                run_queue_add(
                    &endpoint,
                    method.into(),
                    &title,
                    payload.as_deref(),
                    &db_path,
                    offline,
                )
                .await?;
            }
            QueueCommands::Remove { id } => run_queue_remove(&id, &db_path, offline).await?,
        },
        Commands::List {
            collection,
            region,
            station,
            contains,
            page,
            page_size,
            json,
        } => {
            run_list(
                collection.into(),
                ListOptions {
                    region,
                    station,
                    contains,
                    page,
                    page_size,
                    json,
                },
                &db_path,
                offline,
            )
            .await?;
        }
    }

    Ok(())
}
