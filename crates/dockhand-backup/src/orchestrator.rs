//! Sequencing of locks, archiving, rotation and state snapshots
//!
//! Every locked operation follows the same shape:
//!
//! ```text
//! acquire lock ──held──▶ AlreadyRunning
//!      │
//!  enumerate targets ──error──▶ Enumeration (lock released)
//!      │
//!  for each item: act, record success or failure, rotate
//!      │
//!  report (lock released)
//! ```
//!
//! The lock is a guard value living for the whole operation, so it is
//! released on every exit path. Item failures never abort the loop.

use crate::archive::VolumeArchiver;
use crate::context::Context;
use crate::error::OperationError;
use crate::lock::LockFile;
use crate::naming::{ArchiveName, ARCHIVE_EXTENSION};
use crate::report::{Operation, OperationReport};
use crate::rotation::RotationPolicy;
use crate::snapshot::{ContainerSnapshot, StateStore};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Containers carrying `autostop=true` are stopped by [`Orchestrator::autostop`]
pub const AUTOSTOP_LABEL: &str = "autostop";

/// Stopped containers carrying `autostart=true` are started by [`Orchestrator::autostart`]
pub const AUTOSTART_LABEL: &str = "autostart";

/// An archive file found in a backup directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub file_name: String,
    /// Volume and timestamp, when the name follows the convention
    pub parsed: Option<ArchiveName>,
    pub size_bytes: u64,
}

impl BackupEntry {
    pub fn volume(&self) -> Option<&str> {
        self.parsed.as_ref().map(|p| p.volume.as_str())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.parsed.as_ref().map(|p| p.created_at)
    }
}

/// Runs operations against one [`Context`]
pub struct Orchestrator<'a> {
    ctx: &'a Context,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn notify(&self, event: &str, detail: &str) {
        self.ctx.notifier.notify(event, detail);
    }

    /// Report an operation-level failure to the notifier and hand it back
    fn abort(&self, operation: Operation, err: OperationError) -> OperationError {
        warn!("{} aborted: {}", operation, err);
        self.notify(&operation.failed_event(), &err.to_string());
        err
    }

    fn lock(&self, operation: Operation, resource: &Path) -> Result<LockFile, OperationError> {
        let mut lock = LockFile::for_resource(resource);
        if !lock.try_acquire()? {
            info!("{} already running, lock {} is held", operation, lock.path().display());
            return Err(OperationError::AlreadyRunning {
                operation: operation.to_string(),
                lock: lock.path().to_path_buf(),
            });
        }
        Ok(lock)
    }

    fn archiver(&self) -> VolumeArchiver {
        VolumeArchiver::new(
            self.ctx.accessor.clone(),
            self.ctx.settings.compression_level,
        )
    }

    /// Archive every volume into the backup directory and rotate
    pub async fn backup(&self) -> Result<OperationReport, OperationError> {
        let settings = &self.ctx.settings;
        self.archive_all(
            Operation::Backup,
            &settings.backup_dir,
            settings.backup_rotation_count,
        )
        .await
    }

    /// Archive every volume into the manual backup directory and rotate
    pub async fn manual_backup(&self) -> Result<OperationReport, OperationError> {
        let settings = &self.ctx.settings;
        self.archive_all(
            Operation::ManualBackup,
            &settings.manual_backup_dir(),
            settings.manual_rotation_count,
        )
        .await
    }

    async fn archive_all(
        &self,
        operation: Operation,
        dir: &Path,
        retention: i64,
    ) -> Result<OperationReport, OperationError> {
        let _lock = self.lock(operation, self.ctx.settings.backup_lock_resource())?;
        self.notify(&operation.pre_event(), &dir.display().to_string());

        let volumes = match self.ctx.runtime.list_volumes().await {
            Ok(volumes) => volumes,
            Err(e) => return Err(self.abort(operation, OperationError::enumeration(operation.as_str(), e))),
        };
        info!(
            "{}: {} volumes into {} via {} access",
            operation,
            volumes.len(),
            dir.display(),
            self.ctx.accessor.name()
        );

        let archiver = self.archiver();
        let policy = RotationPolicy::new(retention);
        let mut report = OperationReport::new(operation);

        for volume in &volumes {
            let dest = dir.join(ArchiveName::now(volume.as_str()).file_name());
            match archiver.archive(volume, &dest).await {
                Ok(result) => {
                    info!(
                        "Archived {} to {} ({} bytes, {}% saved)",
                        volume,
                        result.archive_path.display(),
                        result.size_bytes,
                        result.stats.compression_percentage()
                    );
                    report.record_success(volume.as_str());

                    match policy.apply(dir, volume) {
                        Ok(evicted) => report.evicted.extend(evicted),
                        Err(e) => warn!("Rotation of {} skipped: {}", volume, e),
                    }
                }
                Err(e) => {
                    warn!("Failed to archive {}: {}", volume, e);
                    self.notify(&operation.failed_event(), &format!("{}: {}", volume, e));
                    report.record_failure(volume.as_str(), e);
                }
            }
        }

        info!("{}", report.summary());
        self.notify(&operation.post_event(), &report.summary());
        Ok(report)
    }

    /// Find an archive given as a path or as a name inside the backup dirs
    pub fn resolve_archive(&self, file: &Path) -> Option<PathBuf> {
        if file.is_file() {
            return Some(file.to_path_buf());
        }
        if file.is_absolute() {
            return None;
        }
        let settings = &self.ctx.settings;
        [settings.backup_dir.join(file), settings.manual_backup_dir().join(file)]
            .into_iter()
            .find(|candidate| candidate.is_file())
    }

    /// Restore one archive into its volume.
    ///
    /// The volume is taken from the archive's name unless `volume_override`
    /// is given.
    pub async fn restore_archive(
        &self,
        file: &Path,
        volume_override: Option<&str>,
    ) -> Result<OperationReport, OperationError> {
        let operation = Operation::Restore;
        let _lock = self.lock(operation, self.ctx.settings.backup_lock_resource())?;
        self.notify(&operation.pre_event(), &file.display().to_string());

        self.restore_resolved(file, volume_override).await
    }

    /// Restore under an already held backup lock
    async fn restore_resolved(
        &self,
        file: &Path,
        volume_override: Option<&str>,
    ) -> Result<OperationReport, OperationError> {
        let operation = Operation::Restore;
        let Some(archive) = self.resolve_archive(file) else {
            let msg = format!("archive {} not found", file.display());
            return Err(self.abort(operation, OperationError::enumeration(operation.as_str(), msg)));
        };

        let volume = match volume_override {
            Some(v) => v.to_string(),
            None => {
                let parsed = archive
                    .file_name()
                    .and_then(|n| ArchiveName::parse(&n.to_string_lossy()));
                match parsed {
                    Some(name) => name.volume,
                    None => {
                        let msg = format!(
                            "cannot derive a volume name from {}; pass one explicitly",
                            archive.display()
                        );
                        return Err(self.abort(
                            operation,
                            OperationError::enumeration(operation.as_str(), msg),
                        ));
                    }
                }
            }
        };

        info!("Restoring {} into volume {}", archive.display(), volume);
        let mut report = OperationReport::new(operation);
        match self.archiver().restore(&volume, &archive).await {
            Ok(bytes) => {
                info!("Restored volume {} ({} bytes)", volume, bytes);
                report.record_success(volume);
            }
            Err(e) => {
                warn!("Failed to restore {}: {}", volume, e);
                self.notify(&operation.failed_event(), &format!("{}: {}", volume, e));
                report.record_failure(volume, e);
            }
        }

        self.notify(&operation.post_event(), &report.summary());
        Ok(report)
    }

    /// Archives in the scheduled backup directory, sorted by file name
    pub fn list_backups(&self) -> Result<Vec<BackupEntry>, OperationError> {
        list_archives(&self.ctx.settings.backup_dir)
    }

    /// Archives in the manual backup directory, sorted by file name
    pub fn list_manual_backups(&self) -> Result<Vec<BackupEntry>, OperationError> {
        list_archives(&self.ctx.settings.manual_backup_dir())
    }

    /// Pick a manual backup by 1-based index or exact file name
    pub fn select_manual_backup(&self, selection: &str) -> Result<BackupEntry, OperationError> {
        let entries = self.list_manual_backups()?;
        let selection = selection.trim();

        let found = match selection.parse::<usize>() {
            Ok(index) if index >= 1 => entries.into_iter().nth(index - 1),
            _ => entries.into_iter().find(|e| e.file_name == selection),
        };

        found.ok_or_else(|| {
            OperationError::enumeration(
                Operation::Restore.as_str(),
                format!("no manual backup matches '{}'", selection),
            )
        })
    }

    /// Restore a manual backup chosen by index or file name.
    ///
    /// The selection is resolved under the backup lock so a concurrent
    /// rotation cannot evict the chosen archive first.
    pub async fn manual_restore(&self, selection: &str) -> Result<OperationReport, OperationError> {
        let operation = Operation::Restore;
        let _lock = self.lock(operation, self.ctx.settings.backup_lock_resource())?;
        self.notify(&operation.pre_event(), selection);

        let entry = match self.select_manual_backup(selection) {
            Ok(entry) => entry,
            Err(e) => return Err(self.abort(operation, e)),
        };
        self.restore_resolved(&entry.path, None).await
    }

    /// Record the running containers into the state file
    pub async fn save(&self) -> Result<OperationReport, OperationError> {
        let operation = Operation::Save;
        let state_file = &self.ctx.settings.state_file;
        let _lock = self.lock(operation, self.ctx.settings.state_lock_resource())?;
        self.notify(&operation.pre_event(), &state_file.display().to_string());

        let running = match self.ctx.runtime.list_containers(false).await {
            Ok(running) => running,
            Err(e) => return Err(self.abort(operation, OperationError::enumeration(operation.as_str(), e))),
        };

        let snapshot = ContainerSnapshot::from_running(running);
        if let Err(e) = StateStore::save(&snapshot, state_file) {
            return Err(self.abort(operation, e.into()));
        }

        let mut report = OperationReport::new(operation);
        for record in &snapshot.containers {
            report.record_success(record.name.as_str());
        }
        info!(
            "Saved {} running containers to {}",
            snapshot.len(),
            state_file.display()
        );
        self.notify(&operation.post_event(), &report.summary());
        Ok(report)
    }

    /// Start every container recorded in the state file
    pub async fn restore_state(&self) -> Result<OperationReport, OperationError> {
        let operation = Operation::StateRestore;
        let state_file = &self.ctx.settings.state_file;
        let _lock = self.lock(operation, self.ctx.settings.state_lock_resource())?;
        self.notify(&operation.pre_event(), &state_file.display().to_string());

        let tally = match StateStore::restore(state_file, self.ctx.runtime.as_ref()).await {
            Ok(tally) => tally,
            Err(e) => return Err(self.abort(operation, OperationError::from(e))),
        };

        let mut report = OperationReport::new(operation);
        for outcome in tally.outcomes {
            if let Some(error) = &outcome.error {
                self.notify(
                    &operation.failed_event(),
                    &format!("{}: {}", outcome.item, error),
                );
            }
            report.record_outcome(outcome);
        }

        info!("Restored {} containers, {} failed", tally.started, tally.failed);
        self.notify(&operation.post_event(), &report.summary());
        Ok(report)
    }

    /// Stop every running container labelled `autostop=true`
    pub async fn autostop(&self) -> Result<OperationReport, OperationError> {
        let operation = Operation::Autostop;
        let running = self
            .ctx
            .runtime
            .list_containers(false)
            .await
            .map_err(|e| OperationError::enumeration(operation.as_str(), e))?;

        let mut report = OperationReport::new(operation);
        for container in running.iter().filter(|c| c.has_flag(AUTOSTOP_LABEL)) {
            match self.ctx.runtime.stop_container(&container.id).await {
                Ok(()) => {
                    info!("Stopped {}", container.name);
                    report.record_success(container.name.as_str());
                }
                Err(e) => {
                    warn!("Failed to stop {}: {}", container.name, e);
                    report.record_failure(container.name.as_str(), e);
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Start every stopped container labelled `autostart=true`
    pub async fn autostart(&self) -> Result<OperationReport, OperationError> {
        let operation = Operation::Autostart;
        let containers = self
            .ctx
            .runtime
            .list_containers(true)
            .await
            .map_err(|e| OperationError::enumeration(operation.as_str(), e))?;

        let mut report = OperationReport::new(operation);
        for container in containers
            .iter()
            .filter(|c| c.has_flag(AUTOSTART_LABEL) && !c.is_running())
        {
            match self.ctx.runtime.start_container(&container.id).await {
                Ok(()) => {
                    info!("Started {}", container.name);
                    report.record_success(container.name.as_str());
                }
                Err(e) => {
                    warn!("Failed to start {}: {}", container.name, e);
                    report.record_failure(container.name.as_str(), e);
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }
}

/// List `.tar.gz` files in `dir`. A missing directory is an empty listing.
pub fn list_archives(dir: &Path) -> Result<Vec<BackupEntry>, OperationError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(OperationError::enumeration(
                "list",
                format!("{}: {}", dir.display(), e),
            ))
        }
    };

    let mut archives = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.ends_with(ARCHIVE_EXTENSION) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        archives.push(BackupEntry {
            path: entry.path(),
            parsed: ArchiveName::parse(&file_name),
            file_name,
            size_bytes: metadata.len(),
        });
    }

    archives.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(archives)
}

