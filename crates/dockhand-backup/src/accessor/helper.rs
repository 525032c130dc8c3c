//! Volume access through an ephemeral helper container

use super::{validate_volume_name, VolumeAccessor};
use crate::error::ArchiveError;
use async_trait::async_trait;
use dockhand_runtime::{ContainerRuntime, HelperSpec};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// Copies volume contents in and out of a short-lived helper container
pub struct HelperAccessor {
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    mount_point: String,
}

impl HelperAccessor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, image: &str, mount_point: &str) -> Self {
        Self {
            runtime,
            image: image.to_string(),
            mount_point: mount_point.to_string(),
        }
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Create and start a helper for `volume`.
    ///
    /// The returned guard owns the container from the moment it exists, so a
    /// failed start still ends in removal.
    async fn launch(&self, volume: &str) -> Result<HelperContainer, ArchiveError> {
        validate_volume_name(volume)?;
        let spec = HelperSpec::new(volume, &self.image, &self.mount_point);
        let id = self
            .runtime
            .create_helper(&spec)
            .await
            .map_err(|source| ArchiveError::HelperCreate {
                volume: volume.to_string(),
                source,
            })?;

        let helper = HelperContainer::new(Arc::clone(&self.runtime), id, volume);
        if let Err(source) = self.runtime.start_container(helper.id()).await {
            helper.teardown().await;
            return Err(ArchiveError::HelperStart {
                volume: volume.to_string(),
                source,
            });
        }
        Ok(helper)
    }
}

#[async_trait]
impl VolumeAccessor for HelperAccessor {
    fn name(&self) -> &'static str {
        "helper"
    }

    async fn export(
        &self,
        volume: &str,
        sink: &mut (dyn Write + Send),
    ) -> Result<u64, ArchiveError> {
        let helper = self.launch(volume).await?;

        let result = self
            .runtime
            .copy_from_container(helper.id(), &self.mount_point, sink)
            .await
            .map_err(|source| ArchiveError::Copy {
                volume: volume.to_string(),
                source,
            });

        helper.teardown().await;
        result
    }

    async fn import(
        &self,
        volume: &str,
        source: &mut (dyn Read + Send),
    ) -> Result<u64, ArchiveError> {
        let helper = self.launch(volume).await?;

        let result = self
            .runtime
            .copy_into_container(helper.id(), &self.mount_point, source)
            .await
            .map_err(|source| ArchiveError::Copy {
                volume: volume.to_string(),
                source,
            });

        helper.teardown().await;
        result
    }
}

/// Scoped ownership of a helper container.
///
/// Call [`HelperContainer::teardown`] on every normal path. If the guard is
/// dropped without it (a panic, or the future being cancelled) a forced
/// removal is scheduled on the current tokio runtime instead.
pub(crate) struct HelperContainer {
    runtime: Arc<dyn ContainerRuntime>,
    id: String,
    volume: String,
    removed: bool,
}

impl HelperContainer {
    pub(crate) fn new(runtime: Arc<dyn ContainerRuntime>, id: String, volume: &str) -> Self {
        Self {
            runtime,
            id,
            volume: volume.to_string(),
            removed: false,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Force-remove the container. Failure is logged, never returned.
    pub(crate) async fn teardown(mut self) {
        self.removed = true;
        match self.runtime.remove_container(&self.id, true).await {
            Ok(()) => debug!("Removed helper {} for volume {}", self.id, self.volume),
            Err(e) => warn!(
                "Failed to remove helper {} for volume {}: {}",
                self.id, self.volume, e
            ),
        }
    }
}

impl Drop for HelperContainer {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        let runtime = Arc::clone(&self.runtime);
        let id = std::mem::take(&mut self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Scheduling removal of abandoned helper {}", id);
                handle.spawn(async move {
                    if let Err(e) = runtime.remove_container(&id, true).await {
                        warn!("Failed to remove abandoned helper {}: {}", id, e);
                    }
                });
            }
            Err(_) => warn!(
                "Helper {} for volume {} leaked: no async runtime to remove it",
                id, self.volume
            ),
        }
    }
}
