//! Archive creation and extraction for single volumes.
//!
//! The tar stream produced by the active [`VolumeAccessor`] is piped straight
//! through gzip into `<dest>.partial`; only a complete archive is renamed to
//! its final name, so listings and rotation never observe a truncated file.

use crate::accessor::VolumeAccessor;
use crate::compression::{gzip_reader, gzip_writer, CompressionStats, CountingWriter};
use crate::error::ArchiveError;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Suffix of an archive that is still being written
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Result of archiving one volume.
#[derive(Debug, Clone)]
pub struct ArchiveResult {
    /// Volume that was archived
    pub volume: String,

    /// Path to the created archive
    pub archive_path: PathBuf,

    /// Size of the archive in bytes
    pub size_bytes: u64,

    /// Uncompressed vs compressed sizes
    pub stats: CompressionStats,

    /// Duration of the operation in seconds
    pub duration_seconds: f64,
}

/// Archives and restores volumes through one accessor.
pub struct VolumeArchiver {
    accessor: Arc<dyn VolumeAccessor>,
    compression_level: u32,
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

impl VolumeArchiver {
    pub fn new(accessor: Arc<dyn VolumeAccessor>, compression_level: u32) -> Self {
        Self {
            accessor,
            compression_level: compression_level.clamp(1, 9),
        }
    }

    /// Write a compressed archive of `volume` to `dest`.
    ///
    /// On failure nothing is left at `dest` or at its partial path.
    pub async fn archive(&self, volume: &str, dest: &Path) -> Result<ArchiveResult, ArchiveError> {
        let start_time = Instant::now();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }

        let partial = partial_path(dest);
        let original_size = match self.write_partial(volume, &partial).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&partial) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove {}: {}", partial.display(), rm);
                    }
                }
                return Err(e);
            }
        };

        fs::rename(&partial, dest).map_err(|e| {
            let _ = fs::remove_file(&partial);
            ArchiveError::io(dest, e)
        })?;

        let size_bytes = fs::metadata(dest).map_err(|e| ArchiveError::io(dest, e))?.len();
        let duration_seconds = start_time.elapsed().as_secs_f64();
        debug!(
            "Archived {} via {} ({} -> {} bytes) in {:.2}s",
            volume,
            self.accessor.name(),
            original_size,
            size_bytes,
            duration_seconds
        );

        Ok(ArchiveResult {
            volume: volume.to_string(),
            archive_path: dest.to_path_buf(),
            size_bytes,
            stats: CompressionStats::new(original_size, size_bytes),
            duration_seconds,
        })
    }

    /// Stream the volume into a gzip file, returning the uncompressed size
    async fn write_partial(&self, volume: &str, partial: &Path) -> Result<u64, ArchiveError> {
        let file = File::create(partial).map_err(|e| ArchiveError::io(partial, e))?;
        let mut counter = CountingWriter::new(gzip_writer(file, self.compression_level));

        self.accessor.export(volume, &mut counter).await?;

        let original_size = counter.bytes_written();
        let mut buffered = counter
            .into_inner()
            .finish()
            .map_err(|e| ArchiveError::io(partial, e))?;
        buffered.flush().map_err(|e| ArchiveError::io(partial, e))?;
        buffered
            .get_ref()
            .sync_all()
            .map_err(|e| ArchiveError::io(partial, e))?;

        Ok(original_size)
    }

    /// Extract the archive at `source` into `volume`.
    ///
    /// Existing files in the volume are overwritten; files absent from the
    /// archive are left in place. Returns the uncompressed bytes consumed.
    pub async fn restore(&self, volume: &str, source: &Path) -> Result<u64, ArchiveError> {
        if !source.is_file() {
            return Err(ArchiveError::ArchiveNotFound {
                path: source.to_path_buf(),
            });
        }

        let file = File::open(source).map_err(|e| ArchiveError::io(source, e))?;
        let mut reader = gzip_reader(file);
        let consumed = self.accessor.import(volume, &mut reader).await?;

        debug!(
            "Restored {} from {} via {} ({} bytes)",
            volume,
            source.display(),
            self.accessor.name(),
            consumed
        );
        Ok(consumed)
    }
}
