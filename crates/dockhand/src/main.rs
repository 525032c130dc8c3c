//! Dockhand CLI - volume backups and container state for a Docker host
//!
//! This is the main entry point for the dockhand command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::{Context as _, Result};
use clap::Parser;
use dockhand_backup::OperationError;
use dockhand_core::Settings;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

/// Exit status for configuration and other unclassified failures
const EXIT_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI args
    let cli = Cli::parse();

    // Settings come first so the log file can be attached
    let settings = Settings::load(cli.config.as_deref());
    let log_file = settings.as_ref().ok().and_then(|s| s.log_file.clone());
    let log_file_error = init_tracing(cli.verbose, cli.quiet, log_file.as_deref()).err();
    if let Some(e) = log_file_error {
        output::warning(&format!("Logging to file disabled: {:#}", e));
    }

    let result = match settings {
        Ok(settings) => run(cli.command, settings).await,
        Err(e) => Err(anyhow::Error::new(e).context("Failed to load configuration")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            if code == 0 {
                output::warning(&e.to_string());
            } else {
                output::error(&format!("{:#}", e));
            }
            ExitCode::from(code)
        }
    }
}

async fn run(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::Backup => commands::backup::run(settings).await,
        Commands::ManualBackup => commands::backup::run_manual(settings).await,
        Commands::ManualRestore(args) => commands::restore::run_manual(args, settings).await,
        Commands::RestoreVolume(args) => commands::restore::run_volume(args, settings).await,
        Commands::ListBackups(args) => commands::restore::list(args, settings),
        Commands::Save => commands::state::save(settings).await,
        Commands::Restore => commands::state::restore(settings).await,
        Commands::Autostop => commands::state::autostop(settings).await,
        Commands::Autostart => commands::state::autostart(settings).await,
        Commands::Config(cmd) => commands::config::run(cmd, settings),
    }
}

/// Map an error to the process exit status of its category
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<OperationError>() {
        Some(op) => u8::try_from(op.exit_code()).unwrap_or(EXIT_FAILURE),
        None => EXIT_FAILURE,
    }
}

/// Initialize tracing with appropriate verbosity.
///
/// With a log file, events are also appended there without ANSI colors.
/// The console layer is installed even when the file cannot be opened.
fn init_tracing(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let (file_layer, file_error) = match log_file.map(open_log_file) {
        Some(Ok(file)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .init();

    match file_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
