//! Archive restore and listing commands

use anyhow::{anyhow, Result};
use console::Term;
use dockhand_backup::{BackupEntry, Operation, Orchestrator};
use dockhand_core::Settings;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::{complete, connect, offline};
use crate::cli::{ListBackupsArgs, ManualRestoreArgs, RestoreVolumeArgs};
use crate::output;

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "#")]
    index: usize,
    file: String,
    volume: String,
    created: String,
    size: String,
}

#[derive(Serialize)]
struct BackupJson {
    index: usize,
    file: String,
    path: String,
    volume: Option<String>,
    created_at: Option<String>,
    size_bytes: u64,
}

fn rows(entries: &[BackupEntry]) -> Vec<BackupRow> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| BackupRow {
            index: i + 1,
            file: e.file_name.clone(),
            volume: e.volume().unwrap_or("?").to_string(),
            created: e
                .created_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
            size: output::format_bytes(e.size_bytes),
        })
        .collect()
}

/// List scheduled or manual archives
pub fn list(args: ListBackupsArgs, settings: Settings) -> Result<()> {
    let dir = if args.manual {
        settings.manual_backup_dir()
    } else {
        settings.backup_dir.clone()
    };
    let ctx = offline(settings);
    let orchestrator = Orchestrator::new(&ctx);
    let entries = if args.manual {
        orchestrator.list_manual_backups()?
    } else {
        orchestrator.list_backups()?
    };

    if args.json {
        let json: Vec<BackupJson> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| BackupJson {
                index: i + 1,
                file: e.file_name.clone(),
                path: e.path.display().to_string(),
                volume: e.volume().map(str::to_string),
                created_at: e.created_at().map(|t| t.to_rfc3339()),
                size_bytes: e.size_bytes,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::warning(&format!("No archives in {}", dir.display()));
        return Ok(());
    }

    let mut table = Table::new(rows(&entries));
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

/// Restore one archive file
pub async fn run_volume(args: RestoreVolumeArgs, settings: Settings) -> Result<()> {
    output::header("Restore Volume");
    output::kv("Archive", &args.archive.display().to_string());
    if let Some(volume) = &args.volume {
        output::kv("Volume", volume);
    }

    let ctx = connect(settings, Operation::Restore).await?;
    let spinner = output::spinner("Restoring...");
    let result = Orchestrator::new(&ctx)
        .restore_archive(&args.archive, args.volume.as_deref())
        .await;
    spinner.finish_and_clear();

    complete(&ctx, result).await
}

/// Restore a manual backup, prompting for one on a terminal
pub async fn run_manual(args: ManualRestoreArgs, settings: Settings) -> Result<()> {
    output::header("Manual Restore");
    let ctx = connect(settings, Operation::Restore).await?;
    let orchestrator = Orchestrator::new(&ctx);

    // The prompt only names a file; it is looked up again under the lock
    let selection = match args.selection {
        Some(selection) => selection,
        None => prompt_for_backup(orchestrator.list_manual_backups()?)?.file_name,
    };
    output::kv("Selection", &selection);

    let spinner = output::spinner("Restoring...");
    let result = orchestrator.manual_restore(&selection).await;
    spinner.finish_and_clear();

    complete(&ctx, result).await
}

fn prompt_for_backup(mut entries: Vec<BackupEntry>) -> Result<BackupEntry> {
    use dialoguer::Select;

    if entries.is_empty() {
        return Err(anyhow!("No manual backups to restore"));
    }
    if !Term::stdout().is_term() {
        return Err(anyhow!(
            "No backup selected; pass a number or file name from `dockhand list-backups --manual`"
        ));
    }

    let items: Vec<String> = entries
        .iter()
        .map(|e| format!("{} ({})", e.file_name, output::format_bytes(e.size_bytes)))
        .collect();
    let selection = Select::new()
        .with_prompt("Select a backup to restore")
        .items(&items)
        .default(items.len() - 1)
        .interact()?;

    Ok(entries.swap_remove(selection))
}
