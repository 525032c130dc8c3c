//! Test fixtures wiring settings, fake runtime and accessor together

#![allow(dead_code)]

use super::mocks::{FakeRuntime, RecordingNotifier};
use dockhand_backup::{Context, DirectAccessor, HelperAccessor, VolumeAccessor};
use dockhand_core::{AccessMode, Settings};
use dockhand_runtime::ContainerRuntime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Scratch host with volumes, a backup dir and a state file
pub struct Fixture {
    pub temp: TempDir,
    pub runtime: Arc<FakeRuntime>,
    pub settings: Settings,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let volumes_root = temp.path().join("volumes");
        fs::create_dir_all(&volumes_root).unwrap();

        let settings = Settings {
            state_file: temp.path().join("state").join("state.json"),
            backup_dir: temp.path().join("backups"),
            backup_rotation_count: 3,
            manual_rotation_count: 2,
            access_mode: AccessMode::Direct,
            volumes_root: volumes_root.clone(),
            ..Settings::default()
        };

        Self {
            runtime: Arc::new(FakeRuntime::new(volumes_root)),
            temp,
            settings,
        }
    }

    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.settings.access_mode = mode;
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.settings.backup_dir
    }

    fn accessor(&self) -> Arc<dyn VolumeAccessor> {
        match self.settings.access_mode {
            AccessMode::Helper => {
                let runtime: Arc<dyn ContainerRuntime> = self.runtime.clone();
                Arc::new(HelperAccessor::new(runtime, "alpine", "/data"))
            }
            _ => Arc::new(DirectAccessor::new(&self.settings.volumes_root)),
        }
    }

    /// Context with a recording notifier
    pub fn context(&self) -> (Context, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let runtime: Arc<dyn ContainerRuntime> = self.runtime.clone();
        let ctx = Context::new(self.settings.clone(), runtime, self.accessor(), notifier.clone());
        (ctx, notifier)
    }

    /// Create a volume holding `files` (a trailing `/` makes a directory)
    pub fn seed_volume(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let dir = self.runtime.add_volume(name);
        for (path, content) in files {
            if let Some(sub) = path.strip_suffix('/') {
                fs::create_dir_all(dir.join(sub)).unwrap();
                continue;
            }
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(target, content).unwrap();
        }
        dir
    }

    /// Archive file names in `dir`, sorted
    pub fn archives_in(&self, dir: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tar.gz"))
            .collect();
        names.sort();
        names
    }
}
