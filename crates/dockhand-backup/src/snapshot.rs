//! Persisted snapshot of running containers
//!
//! The snapshot is pretty-printed JSON written through a temporary file in
//! the same directory and renamed into place, so a reader sees either the
//! previous snapshot or the new one. A truncated or otherwise unreadable
//! file is a [`SnapshotError::Corrupt`], never a partial restore.
//!
//! Older snapshots were a bare JSON array of runtime container objects
//! (`Id`, `Names`, `Image`, `Labels`); those still load.

use crate::error::SnapshotError;
use crate::report::ItemOutcome;
use chrono::{DateTime, Utc};
use dockhand_runtime::{ContainerRuntime, ContainerSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Identity of one container captured at save time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl From<ContainerSummary> for ContainerRecord {
    fn from(summary: ContainerSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            image: summary.image,
            labels: summary.labels,
        }
    }
}

/// Ordered list of container identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub containers: Vec<ContainerRecord>,
}

impl ContainerSnapshot {
    pub fn new(containers: Vec<ContainerRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            containers,
        }
    }

    /// Snapshot the running containers out of a runtime listing
    pub fn from_running(summaries: Vec<ContainerSummary>) -> Self {
        Self::new(
            summaries
                .into_iter()
                .filter(ContainerSummary::is_running)
                .map(ContainerRecord::from)
                .collect(),
        )
    }

    pub fn ids(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

/// Container object as written by the older array format
#[derive(Debug, Deserialize)]
struct LegacyContainer {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Labels", default)]
    labels: Option<BTreeMap<String, String>>,
}

impl From<LegacyContainer> for ContainerRecord {
    fn from(legacy: LegacyContainer) -> Self {
        let name = legacy
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();
        Self {
            id: legacy.id,
            name,
            image: legacy.image,
            labels: legacy.labels.unwrap_or_default(),
        }
    }
}

/// Outcome of starting the containers in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreTally {
    pub started: usize,
    pub failed: usize,
    pub outcomes: Vec<ItemOutcome>,
}

/// Reads, writes and replays container snapshots
pub struct StateStore;

impl StateStore {
    /// Atomically replace `path` with `snapshot`
    pub fn save(snapshot: &ContainerSnapshot, path: &Path) -> Result<(), SnapshotError> {
        let write_err = |source: std::io::Error| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        };

        let encoded = serde_json::to_vec_pretty(snapshot).map_err(SnapshotError::Encode)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(&encoded).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(
            "Wrote snapshot of {} containers to {}",
            snapshot.len(),
            path.display()
        );
        Ok(())
    }

    /// Decode the snapshot at `path`
    pub fn load(path: &Path) -> Result<ContainerSnapshot, SnapshotError> {
        let raw = fs::read(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let corrupt = |source: serde_json::Error| SnapshotError::Corrupt {
            path: path.to_path_buf(),
            source,
        };

        let value: Value = serde_json::from_slice(&raw).map_err(corrupt)?;
        if value.is_array() {
            debug!("{} uses the legacy array format", path.display());
            let legacy: Vec<LegacyContainer> = serde_json::from_value(value).map_err(corrupt)?;
            let saved_at = fs::metadata(path)
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            return Ok(ContainerSnapshot {
                version: SNAPSHOT_VERSION,
                saved_at,
                containers: legacy.into_iter().map(ContainerRecord::from).collect(),
            });
        }

        if let Some(version) = value.get("version").and_then(Value::as_u64) {
            if version > u64::from(SNAPSHOT_VERSION) {
                return Err(SnapshotError::UnsupportedVersion {
                    path: path.to_path_buf(),
                    version: u32::try_from(version).unwrap_or(u32::MAX),
                });
            }
        }

        serde_json::from_value(value).map_err(corrupt)
    }

    /// Start every container recorded at `path`.
    ///
    /// Containers are started by id. A failed start is logged and counted
    /// and the remaining records are still attempted.
    pub async fn restore(
        path: &Path,
        runtime: &dyn ContainerRuntime,
    ) -> Result<RestoreTally, SnapshotError> {
        let snapshot = Self::load(path)?;
        info!(
            "Restoring {} containers saved at {}",
            snapshot.len(),
            snapshot.saved_at.to_rfc3339()
        );

        let mut tally = RestoreTally::default();
        for record in &snapshot.containers {
            let label = if record.name.is_empty() {
                record.id.clone()
            } else {
                format!("{} ({})", record.name, record.id)
            };

            match runtime.start_container(&record.id).await {
                Ok(()) => {
                    info!("Started {}", label);
                    tally.started += 1;
                    tally.outcomes.push(ItemOutcome::success(label));
                }
                Err(e) => {
                    warn!("Failed to start {}: {}", label, e);
                    tally.failed += 1;
                    tally.outcomes.push(ItemOutcome::failure(label, e.to_string()));
                }
            }
        }

        Ok(tally)
    }
}
