//! Runtime capability trait definitions

use crate::error::Result;
use crate::utils::sanitize_name;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Label set on every helper container so stray ones can be found
pub const HELPER_LABEL: &str = "dockhand.helper";

/// A container as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Runtime-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Runtime state (`running`, `exited`, ...)
    pub state: String,
    /// Container labels
    pub labels: BTreeMap<String, String>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }

    /// Whether `label` is set to `true`
    pub fn has_flag(&self, label: &str) -> bool {
        self.labels
            .get(label)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Description of a short-lived helper container exposing one volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperSpec {
    /// Container name
    pub name: String,
    /// Image to run
    pub image: String,
    /// Volume mounted into the helper
    pub volume: String,
    /// Absolute mount point of the volume inside the helper
    pub mount_point: String,
    /// Keep-alive command
    pub command: Vec<String>,
}

impl HelperSpec {
    /// Build a helper spec with a unique name for `volume`
    pub fn new(volume: &str, image: &str, mount_point: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            name: format!("dockhand-helper-{}-{}", sanitize_name(volume), &suffix[..12]),
            image: image.to_string(),
            volume: volume.to_string(),
            mount_point: mount_point.to_string(),
            command: vec!["sleep".to_string(), "3600".to_string()],
        }
    }
}

/// Operations the backup core needs from a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Get the runtime name
    fn name(&self) -> &'static str;

    /// List the names of all volumes
    async fn list_volumes(&self) -> Result<Vec<String>>;

    /// List containers; only running ones unless `all` is set
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Create (but do not start) a helper container, returning its id
    async fn create_helper(&self, spec: &HelperSpec) -> Result<String>;

    /// Start a container by id or name
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Stop a container by id or name
    async fn stop_container(&self, id: &str) -> Result<()>;

    /// Remove a container by id or name
    async fn remove_container(&self, id: &str, force: bool) -> Result<()>;

    /// Stream a tar archive of the contents of `path` inside the container
    /// into `sink`. Entry names are relative to `path`. Returns bytes copied.
    async fn copy_from_container(
        &self,
        id: &str,
        path: &str,
        sink: &mut (dyn Write + Send),
    ) -> Result<u64>;

    /// Extract the tar stream read from `source` into `path` inside the
    /// container. Returns bytes copied.
    async fn copy_into_container(
        &self,
        id: &str,
        path: &str,
        source: &mut (dyn Read + Send),
    ) -> Result<u64>;
}
