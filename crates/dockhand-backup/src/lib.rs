//! Dockhand backup core
//!
//! Volume archival with rotation, container state snapshots, and the
//! locking that keeps concurrent invocations apart.
//!
//! # Features
//!
//! - **Locking**: non-blocking advisory lock files (`<resource>.lock`);
//!   contention is reported as "already running", not as a fault
//! - **Archiving**: streaming tar+gzip of one volume at a time, through
//!   direct host access or an ephemeral helper container
//! - **Rotation**: keeps the newest N archives per volume, ordered by the
//!   timestamp in the file name with an mtime fallback
//! - **State snapshots**: save the running container set and start it again
//!   after a reboot, best effort per container
//! - **Orchestration**: per-item failures are tallied, never fatal
//!
//! # Examples
//!
//! ```no_run
//! use dockhand_backup::{Context, Orchestrator};
//! use dockhand_core::Settings;
//! use dockhand_runtime::DockerCli;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let runtime = Arc::new(DockerCli::with_binary(&settings.docker_binary));
//!     let ctx = Context::from_settings(settings, runtime);
//!
//!     let report = Orchestrator::new(&ctx).backup().await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod accessor;
pub mod archive;
pub mod compression;
pub mod context;
pub mod error;
pub mod lock;
pub mod naming;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod rotation;
pub mod snapshot;

// Re-export commonly used types
pub use accessor::{select_accessor, DirectAccessor, HelperAccessor, VolumeAccessor};
pub use archive::{ArchiveResult, VolumeArchiver};
pub use compression::{CompressionStats, DEFAULT_COMPRESSION_LEVEL};
pub use context::{Context, NOTIFY_DRAIN_TIMEOUT};
pub use error::{ArchiveError, LockError, OperationError, RotationError, SnapshotError};
pub use lock::LockFile;
pub use naming::{ArchiveName, ARCHIVE_EXTENSION};
pub use notify::{HookNotifier, NoopNotifier, Notifier};
pub use orchestrator::{list_archives, BackupEntry, Orchestrator, AUTOSTART_LABEL, AUTOSTOP_LABEL};
pub use report::{ItemOutcome, Operation, OperationReport};
pub use rotation::{ArchiveArtifact, RotationPolicy, RotationState};
pub use snapshot::{ContainerRecord, ContainerSnapshot, RestoreTally, StateStore, SNAPSHOT_VERSION};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_naming_constants() {
        assert_eq!(ARCHIVE_EXTENSION, ".tar.gz");
        assert_eq!(SNAPSHOT_VERSION, 1);
    }
}
