//! Volume access strategies
//!
//! The archiver never branches on platform. It talks to one
//! [`VolumeAccessor`] chosen once at startup by [`select_accessor`]:
//!
//! - [`DirectAccessor`] walks the runtime's volume storage on this host
//! - [`HelperAccessor`] copies through a short-lived helper container,
//!   which works against remote daemons and isolated runtimes too
//!
//! Both produce the same format: a tar stream whose entry names are
//! relative to the volume root.

mod direct;
mod helper;

pub use direct::DirectAccessor;
pub use helper::HelperAccessor;

use crate::error::ArchiveError;
use async_trait::async_trait;
use dockhand_core::{AccessMode, Settings};
use dockhand_runtime::ContainerRuntime;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Reads and writes the contents of a named volume as a tar stream
#[async_trait]
pub trait VolumeAccessor: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Write an uncompressed tar stream of `volume` into `sink`.
    /// Returns the number of bytes written.
    async fn export(&self, volume: &str, sink: &mut (dyn Write + Send))
        -> Result<u64, ArchiveError>;

    /// Extract the tar stream read from `source` into `volume`.
    /// Returns the number of bytes consumed.
    async fn import(&self, volume: &str, source: &mut (dyn Read + Send))
        -> Result<u64, ArchiveError>;
}

/// Check `volume` against the runtime's naming rule
/// (`[A-Za-z0-9][A-Za-z0-9_.-]*`).
///
/// Names are joined onto host paths and mount specs, so separators and
/// parent references must never get through.
pub fn validate_volume_name(volume: &str) -> Result<(), ArchiveError> {
    let mut chars = volume.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphanumeric()
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidVolumeName {
            volume: volume.to_string(),
        })
    }
}

/// Whether this process can read the runtime's volume storage directly
pub fn direct_access_available(volumes_root: &Path, docker_host: Option<&str>) -> bool {
    let local_daemon = match docker_host {
        None => true,
        Some(host) => host.trim().is_empty() || host.starts_with("unix://"),
    };
    local_daemon && std::fs::read_dir(volumes_root).is_ok()
}

/// Pick the accessor for this process once, from settings and environment
pub fn select_accessor(
    settings: &Settings,
    runtime: Arc<dyn ContainerRuntime>,
) -> Arc<dyn VolumeAccessor> {
    let direct = match settings.access_mode {
        AccessMode::Direct => true,
        AccessMode::Helper => false,
        AccessMode::Auto => {
            let docker_host = std::env::var("DOCKER_HOST").ok();
            direct_access_available(&settings.volumes_root, docker_host.as_deref())
        }
    };

    let accessor: Arc<dyn VolumeAccessor> = if direct {
        Arc::new(DirectAccessor::new(&settings.volumes_root))
    } else {
        Arc::new(HelperAccessor::new(
            runtime,
            &settings.helper_image,
            &settings.helper_mount_point,
        ))
    };

    info!(
        "Volume access: {} (mode {})",
        accessor.name(),
        settings.access_mode
    );
    accessor
}
