use std::path::Path;

use gridscout_core::sync::{SyncOutcome, TriggerOutcome};

use crate::commands::common::{format_millis, open_client};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, offline: bool) -> Result<(), CliError> {
    let client = open_client(db_path, offline).await?;
    report(client.engine.trigger().await);

    let remaining = client.queue.count().await?;
    if remaining > 0 {
        println!("{remaining} mutation(s) still queued; run `gridscout queue list` for details");
    }
    if let Some(last) = client.engine.last_sync_time().await? {
        println!("Last sync: {}", format_millis(last));
    }
    Ok(())
}

pub async fn run_resync(db_path: &Path, offline: bool) -> Result<(), CliError> {
    let client = open_client(db_path, offline).await?;
    client.engine.clear_watermarks().await?;
    println!("Watermarks cleared; pulling every collection in full");
    report(client.engine.trigger().await);
    Ok(())
}

fn report(outcome: TriggerOutcome) {
    match outcome {
        TriggerOutcome::Ran(SyncOutcome::Completed(report)) => {
            if report.success {
                println!(
                    "Sync completed: {} mutation(s) delivered",
                    report.success_count
                );
            } else {
                println!(
                    "Sync finished with failures: {} delivered, {} failed",
                    report.success_count, report.failure_count
                );
            }
        }
        TriggerOutcome::Ran(SyncOutcome::Offline) => {
            println!("Offline: sync skipped, queued mutations kept for later");
        }
        TriggerOutcome::Ran(SyncOutcome::Failed { error }) => {
            println!("Sync aborted: {error}");
        }
        TriggerOutcome::AlreadySyncing => {
            println!("A sync cycle is already running");
        }
    }
}
