//! Retention-based eviction of old archives
//!
//! Archives of one volume are ordered by the timestamp in their name. Files
//! that match the volume's series but carry an unreadable timestamp are
//! ordered by modification time instead; they are never an error.

use crate::error::RotationError;
use crate::naming::{classify, SeriesMatch};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// One archive file in a volume's series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub volume: String,
    pub created_at: DateTime<Utc>,
    /// `false` when `created_at` came from the file's mtime
    pub from_name: bool,
}

impl ArchiveArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A volume's series split into what stays and what goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationState {
    /// Most recent archives, oldest first
    pub retain: Vec<ArchiveArtifact>,
    /// Archives to delete, oldest first
    pub evict: Vec<ArchiveArtifact>,
}

fn modified_at(path: &Path) -> DateTime<Utc> {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(e) => {
            warn!("Cannot read mtime of {}: {}", path.display(), e);
            DateTime::<Utc>::from(UNIX_EPOCH)
        }
    }
}

/// List the archives of `volume` in `dir`, oldest first.
///
/// Ties are broken by path so the order is total.
pub fn list_series(dir: &Path, volume: &str) -> Result<Vec<ArchiveArtifact>, RotationError> {
    let entries = fs::read_dir(dir).map_err(|source| RotationError::List {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut series = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RotationError::List {
            dir: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let (created_at, from_name) = match classify(volume, &name) {
            SeriesMatch::Foreign => continue,
            SeriesMatch::Dated(ts) => (ts, true),
            SeriesMatch::Malformed => {
                debug!("{} has no readable timestamp, using mtime", name);
                (modified_at(&path), false)
            }
        };

        series.push(ArchiveArtifact {
            path,
            volume: volume.to_string(),
            created_at,
            from_name,
        });
    }

    series.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(series)
}

/// Keep the newest `retention` archives per volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    retention: i64,
}

impl RotationPolicy {
    pub fn new(retention: i64) -> Self {
        Self { retention }
    }

    /// A retention of zero or less turns rotation off
    pub fn is_enabled(&self) -> bool {
        self.retention > 0
    }

    pub fn retention(&self) -> i64 {
        self.retention
    }

    /// Partition a sorted series
    pub fn plan(&self, mut series: Vec<ArchiveArtifact>) -> RotationState {
        if !self.is_enabled() {
            return RotationState {
                retain: series,
                evict: Vec::new(),
            };
        }

        let keep = usize::try_from(self.retention).unwrap_or(usize::MAX);
        let excess = series.len().saturating_sub(keep);
        let retain = series.split_off(excess);
        RotationState {
            retain,
            evict: series,
        }
    }

    /// Delete the archives of `volume` in `dir` beyond the retention count.
    ///
    /// Returns the paths actually deleted. A failed deletion is logged and
    /// the remaining ones still run.
    pub fn apply(&self, dir: &Path, volume: &str) -> Result<Vec<PathBuf>, RotationError> {
        if !self.is_enabled() {
            debug!("Rotation disabled for {}", volume);
            return Ok(Vec::new());
        }

        let state = self.plan(list_series(dir, volume)?);
        let mut evicted = Vec::with_capacity(state.evict.len());
        for artifact in state.evict {
            match fs::remove_file(&artifact.path) {
                Ok(()) => {
                    info!("Evicted old archive {}", artifact.path.display());
                    evicted.push(artifact.path);
                }
                Err(e) => warn!("Failed to evict {}: {}", artifact.path.display(), e),
            }
        }
        Ok(evicted)
    }
}
