//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Dockhand - volume backups and container state for a Docker host
#[derive(Parser, Debug)]
#[command(name = "dockhand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to dockhand.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive every volume into the backup directory and rotate old archives
    Backup,

    /// Archive every volume into the manual backup directory
    ManualBackup,

    /// Restore a manual backup, chosen by number or file name
    ManualRestore(ManualRestoreArgs),

    /// Restore a single archive into its volume
    RestoreVolume(RestoreVolumeArgs),

    /// List archives in the backup directory
    ListBackups(ListBackupsArgs),

    /// Record the running containers to the state file
    Save,

    /// Start the containers recorded in the state file
    Restore,

    /// Stop running containers labelled autostop=true
    Autostop,

    /// Start stopped containers labelled autostart=true
    Autostart,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ManualRestoreArgs {
    /// 1-based number from `list-backups --manual`, or an archive file name.
    /// Prompts when omitted on a terminal.
    pub selection: Option<String>,
}

#[derive(Args, Debug)]
pub struct RestoreVolumeArgs {
    /// Archive path, or a file name inside the backup directory
    pub archive: PathBuf,

    /// Target volume (defaults to the volume named in the archive)
    #[arg(long)]
    pub volume: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListBackupsArgs {
    /// List manual backups instead of scheduled ones
    #[arg(long)]
    pub manual: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
