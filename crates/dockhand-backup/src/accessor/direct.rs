//! Direct filesystem access to `<volumes_root>/<volume>/_data`

use super::{validate_volume_name, VolumeAccessor};
use crate::compression::{CountingReader, CountingWriter};
use crate::error::ArchiveError;
use async_trait::async_trait;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;
use walkdir::WalkDir;

/// Directory under each volume that holds its contents
const DATA_DIR: &str = "_data";

/// Walks volume data on the local host
#[derive(Debug, Clone)]
pub struct DirectAccessor {
    volumes_root: PathBuf,
}

impl DirectAccessor {
    pub fn new(volumes_root: impl Into<PathBuf>) -> Self {
        Self {
            volumes_root: volumes_root.into(),
        }
    }

    /// Host path of a volume's contents
    pub fn data_dir(&self, volume: &str) -> Result<PathBuf, ArchiveError> {
        validate_volume_name(volume)?;
        Ok(self.volumes_root.join(volume).join(DATA_DIR))
    }

    fn existing_data_dir(&self, volume: &str) -> Result<PathBuf, ArchiveError> {
        let dir = self.data_dir(volume)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ArchiveError::VolumeNotFound {
                volume: volume.to_string(),
            })
        }
    }
}

/// Run synchronous filesystem work without stalling the other tasks on this
/// worker. `block_in_place` needs the multi-thread scheduler, so on a
/// current-thread runtime the work runs inline.
fn run_blocking<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Depth-first, name-sorted walk of `root` into a tar stream.
///
/// Entry names are relative to `root`; directories are emitted so empty
/// ones survive a round trip. Sockets and other special files are skipped.
pub(crate) fn write_tree<W: Write>(root: &Path, sink: W) -> Result<W, ArchiveError> {
    let mut builder = Builder::new(sink);
    builder.follow_symlinks(false);

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ArchiveError::io(path, e.into())
        })?;

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ArchiveError::io(entry.path(), std::io::Error::other(e)))?;

        let file_type = entry.file_type();
        let appended = if file_type.is_dir() {
            builder.append_dir(rel_path, entry.path())
        } else if file_type.is_file() || file_type.is_symlink() {
            builder.append_path_with_name(entry.path(), rel_path)
        } else {
            debug!("Skipping special file {}", entry.path().display());
            continue;
        };
        appended.map_err(|e| ArchiveError::io(entry.path(), e))?;
    }

    builder
        .into_inner()
        .map_err(|e| ArchiveError::io(root, e))
}

/// Extract a tar stream under `root`, overwriting existing entries
pub(crate) fn unpack_tree<R: Read>(root: &Path, source: R) -> Result<(), ArchiveError> {
    let mut archive = Archive::new(source);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    archive
        .unpack(root)
        .map_err(|e| ArchiveError::io(root, e))
}

#[async_trait]
impl VolumeAccessor for DirectAccessor {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn export(
        &self,
        volume: &str,
        sink: &mut (dyn Write + Send),
    ) -> Result<u64, ArchiveError> {
        let dir = self.existing_data_dir(volume)?;
        debug!("Walking {} for volume {}", dir.display(), volume);

        run_blocking(|| {
            let mut counter = CountingWriter::new(sink);
            write_tree(&dir, &mut counter)?;
            counter.flush().map_err(|e| ArchiveError::io(&dir, e))?;
            Ok(counter.bytes_written())
        })
    }

    async fn import(
        &self,
        volume: &str,
        source: &mut (dyn Read + Send),
    ) -> Result<u64, ArchiveError> {
        let dir = self.existing_data_dir(volume)?;
        debug!("Unpacking into {} for volume {}", dir.display(), volume);

        run_blocking(|| {
            let mut counter = CountingReader::new(source);
            unpack_tree(&dir, &mut counter)?;
            Ok(counter.bytes_read())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry_names(tar_bytes: &[u8]) -> Vec<String> {
        let mut archive = Archive::new(tar_bytes);
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_export_uses_relative_sorted_names() {
        let root = TempDir::new().unwrap();
        let data = root.path().join("web/_data");
        fs::create_dir_all(data.join("b/nested")).unwrap();
        fs::create_dir_all(data.join("a")).unwrap();
        fs::write(data.join("b/nested/deep.txt"), "deep").unwrap();
        fs::write(data.join("a/one.txt"), "one").unwrap();
        fs::write(data.join("z.txt"), "").unwrap();

        let accessor = DirectAccessor::new(root.path());
        let mut out = Vec::new();
        let written = accessor.export("web", &mut out).await.unwrap();

        assert_eq!(written, out.len() as u64);
        let names: Vec<String> = entry_names(&out)
            .into_iter()
            .map(|n| n.trim_end_matches('/').to_string())
            .collect();
        assert_eq!(
            names,
            vec!["a", "a/one.txt", "b", "b/nested", "b/nested/deep.txt", "z.txt"]
        );
        assert!(names.iter().all(|n| !n.starts_with('/')));
    }

    #[tokio::test]
    async fn test_missing_volume() {
        let root = TempDir::new().unwrap();
        let accessor = DirectAccessor::new(root.path());

        let mut out = Vec::new();
        let err = accessor.export("ghost", &mut out).await.unwrap_err();
        assert!(matches!(err, ArchiveError::VolumeNotFound { .. }));

        let mut input: &[u8] = &[];
        let err = accessor.import("ghost", &mut input).await.unwrap_err();
        assert!(matches!(err, ArchiveError::VolumeNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rejects_names_escaping_the_root() {
        let root = TempDir::new().unwrap();
        let outside = root.path().join("outside/_data");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret"), "x").unwrap();
        let accessor = DirectAccessor::new(root.path().join("volumes"));

        let mut out = Vec::new();
        let err = accessor.export("../outside", &mut out).await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidVolumeName { .. }));
        assert!(out.is_empty());

        let mut input: &[u8] = &[];
        let err = accessor.import("../../x", &mut input).await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidVolumeName { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_round_trip_on_multi_thread_runtime() {
        let root = TempDir::new().unwrap();
        let src = root.path().join("logs/_data");
        let dst = root.path().join("logs_copy/_data");
        fs::create_dir_all(src.join("2024")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("2024/app.log"), "line\n".repeat(500)).unwrap();

        let accessor = DirectAccessor::new(root.path());
        let mut stream = Vec::new();
        let written = accessor.export("logs", &mut stream).await.unwrap();
        assert_eq!(written, stream.len() as u64);

        let mut reader: &[u8] = &stream;
        accessor.import("logs_copy", &mut reader).await.unwrap();
        assert_eq!(
            fs::read(dst.join("2024/app.log")).unwrap(),
            fs::read(src.join("2024/app.log")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_import_overwrites_existing_files() {
        let root = TempDir::new().unwrap();
        let src = root.path().join("src/_data");
        let dst = root.path().join("dst/_data");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("config.ini"), "new").unwrap();
        fs::write(dst.join("config.ini"), "old").unwrap();
        fs::write(dst.join("keep.txt"), "untouched").unwrap();

        let accessor = DirectAccessor::new(root.path());
        let mut stream = Vec::new();
        accessor.export("src", &mut stream).await.unwrap();

        let mut reader: &[u8] = &stream;
        let read = accessor.import("dst", &mut reader).await.unwrap();

        assert!(read > 0);
        assert_eq!(fs::read_to_string(dst.join("config.ini")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "untouched");
    }
}
