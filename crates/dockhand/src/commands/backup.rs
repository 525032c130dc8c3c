//! Backup commands

use anyhow::Result;
use dockhand_backup::{Operation, Orchestrator};
use dockhand_core::Settings;

use super::{complete, connect};
use crate::output;

/// Scheduled backup of every volume
pub async fn run(settings: Settings) -> Result<()> {
    archive_all(settings, Operation::Backup).await
}

/// User-initiated backup into the manual directory
pub async fn run_manual(settings: Settings) -> Result<()> {
    archive_all(settings, Operation::ManualBackup).await
}

async fn archive_all(settings: Settings, operation: Operation) -> Result<()> {
    let (title, dir, retention) = match operation {
        Operation::ManualBackup => (
            "Manual Backup",
            settings.manual_backup_dir(),
            settings.manual_rotation_count,
        ),
        _ => (
            "Backup Volumes",
            settings.backup_dir.clone(),
            settings.backup_rotation_count,
        ),
    };

    output::header(title);
    output::kv("Destination", &dir.display().to_string());
    output::kv(
        "Retention",
        &if retention > 0 {
            format!("{} per volume", retention)
        } else {
            "disabled".to_string()
        },
    );

    let ctx = connect(settings, operation).await?;
    output::kv("Access", ctx.accessor.name());
    println!();

    let spinner = output::spinner("Archiving volumes...");
    let orchestrator = Orchestrator::new(&ctx);
    let result = match operation {
        Operation::ManualBackup => orchestrator.manual_backup().await,
        _ => orchestrator.backup().await,
    };
    spinner.finish_and_clear();

    complete(&ctx, result).await
}
