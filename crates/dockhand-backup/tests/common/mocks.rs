//! Mock implementations for testing
//!
//! [`FakeRuntime`] keeps volumes as `<root>/<volume>/_data` directories, the
//! same layout the direct accessor reads, so both access strategies can run
//! against one fake. Failures are injected per volume or per container id.

#![allow(dead_code)]

use async_trait::async_trait;
use dockhand_backup::Notifier;
use dockhand_runtime::{ContainerRuntime, ContainerSummary, HelperSpec, RuntimeError};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    volumes: Vec<String>,
    containers: Vec<ContainerSummary>,
    helpers: BTreeMap<String, String>,
    next_helper: usize,

    fail_listing: bool,
    fail_create: BTreeSet<String>,
    fail_copy: BTreeSet<String>,
    fail_start: BTreeSet<String>,
    fail_stop: BTreeSet<String>,

    created: Vec<String>,
    started: Vec<String>,
    stopped: Vec<String>,
    removed: Vec<String>,
}

/// In-memory container runtime backed by a temp directory
pub struct FakeRuntime {
    volumes_root: PathBuf,
    state: Mutex<FakeState>,
}

fn injected(what: &str, target: &str) -> RuntimeError {
    RuntimeError::command_failed(
        format!("fake {} {}", what, target),
        Some(1),
        b"injected failure",
    )
}

impl FakeRuntime {
    pub fn new(volumes_root: impl Into<PathBuf>) -> Self {
        Self {
            volumes_root: volumes_root.into(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn data_dir(&self, volume: &str) -> PathBuf {
        self.volumes_root.join(volume).join("_data")
    }

    /// Register a volume and create its (empty) data directory
    pub fn add_volume(&self, name: &str) -> PathBuf {
        let dir = self.data_dir(name);
        std::fs::create_dir_all(&dir).unwrap();
        let mut state = self.state.lock().unwrap();
        if !state.volumes.iter().any(|v| v == name) {
            state.volumes.push(name.to_string());
        }
        dir
    }

    /// Register a volume the runtime lists but whose data is gone
    pub fn add_dangling_volume(&self, name: &str) {
        self.state.lock().unwrap().volumes.push(name.to_string());
    }

    pub fn add_container(&self, id: &str, name: &str, running: bool, labels: &[(&str, &str)]) {
        self.state.lock().unwrap().containers.push(ContainerSummary {
            id: id.to_string(),
            name: name.to_string(),
            image: format!("{}:latest", name),
            state: if running { "running" } else { "exited" }.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn fail_helper_create(&self, volume: &str) {
        self.state.lock().unwrap().fail_create.insert(volume.to_string());
    }

    pub fn fail_copy(&self, volume: &str) {
        self.state.lock().unwrap().fail_copy.insert(volume.to_string());
    }

    pub fn fail_start(&self, id: &str) {
        self.state.lock().unwrap().fail_start.insert(id.to_string());
    }

    pub fn fail_stop(&self, id: &str) {
        self.state.lock().unwrap().fail_stop.insert(id.to_string());
    }

    /// Helper ids in creation order
    pub fn created_helpers(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    /// Helpers created but never removed
    pub fn live_helpers(&self) -> Vec<String> {
        self.state.lock().unwrap().helpers.keys().cloned().collect()
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.state.lock().unwrap().removed.clone()
    }

    fn helper_volume(&self, id: &str) -> Result<String, RuntimeError> {
        self.state
            .lock()
            .unwrap()
            .helpers
            .get(id)
            .cloned()
            .ok_or_else(|| injected("lookup", id))
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_volumes(&self) -> dockhand_runtime::Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(injected("volume ls", ""));
        }
        Ok(state.volumes.clone())
    }

    async fn list_containers(&self, all: bool) -> dockhand_runtime::Result<Vec<ContainerSummary>> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(injected("ps", ""));
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| all || c.is_running())
            .cloned()
            .collect())
    }

    async fn create_helper(&self, spec: &HelperSpec) -> dockhand_runtime::Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create.contains(&spec.volume) {
            return Err(injected("create", &spec.volume));
        }
        // Like docker, mounting an unknown volume creates it
        std::fs::create_dir_all(self.data_dir(&spec.volume))?;

        state.next_helper += 1;
        let id = format!("helper-{}", state.next_helper);
        state.helpers.insert(id.clone(), spec.volume.clone());
        state.created.push(id.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> dockhand_runtime::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_start.contains(id) {
            return Err(injected("start", id));
        }
        if let Some(c) = state.containers.iter_mut().find(|c| c.id == id) {
            c.state = "running".to_string();
        }
        state.started.push(id.to_string());
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> dockhand_runtime::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stop.contains(id) {
            return Err(injected("stop", id));
        }
        if let Some(c) = state.containers.iter_mut().find(|c| c.id == id) {
            c.state = "exited".to_string();
        }
        state.stopped.push(id.to_string());
        Ok(())
    }

    async fn remove_container(&self, id: &str, _force: bool) -> dockhand_runtime::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.helpers.remove(id);
        state.removed.push(id.to_string());
        Ok(())
    }

    async fn copy_from_container(
        &self,
        id: &str,
        _path: &str,
        sink: &mut (dyn Write + Send),
    ) -> dockhand_runtime::Result<u64> {
        let volume = self.helper_volume(id)?;
        if self.state.lock().unwrap().fail_copy.contains(&volume) {
            // Some bytes escape before the stream breaks
            sink.write_all(&[0u8; 512])?;
            return Err(injected("cp", &volume));
        }

        // Entry names relative to the mount point, as `docker cp <id>:/data/. -` emits
        let mut builder = tar::Builder::new(Vec::new());
        builder.append_dir_all("", self.data_dir(&volume))?;
        let bytes = builder.into_inner()?;
        sink.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    async fn copy_into_container(
        &self,
        id: &str,
        _path: &str,
        source: &mut (dyn Read + Send),
    ) -> dockhand_runtime::Result<u64> {
        let volume = self.helper_volume(id)?;
        if self.state.lock().unwrap().fail_copy.contains(&volume) {
            return Err(injected("cp", &volume));
        }

        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let mut archive = tar::Archive::new(bytes.as_slice());
        archive.set_overwrite(true);
        archive.unpack(self.data_dir(&volume))?;
        Ok(bytes.len() as u64)
    }
}

/// Notifier that records every event it receives
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn details(&self, event: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == event)
            .map(|(_, detail)| detail.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &str, detail: &str) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), detail.to_string()));
    }
}

/// Snapshot of a directory tree: relative path -> file bytes (None for dirs)
pub fn tree_contents(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            let content = if e.file_type().is_dir() {
                None
            } else {
                Some(std::fs::read(e.path()).unwrap())
            };
            (rel, content)
        })
        .collect()
}
