//! Settings file loading and environment overrides

use super::types::AccessMode;
use crate::error::{Error, Result};
use crate::utils::{default_config_dir, default_data_dir};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["dockhand.yaml", "dockhand.yml"];

/// Prefix for environment variable overrides (`DOCKHAND_BACKUP_DIR`, ...)
pub const ENV_PREFIX: &str = "DOCKHAND_";

/// Default number of scheduled archives kept per volume
const DEFAULT_ROTATION_COUNT: i64 = 7;

/// Default number of manual archives kept per volume
const DEFAULT_MANUAL_ROTATION_COUNT: i64 = 5;

/// Default gzip level (balanced speed/ratio)
const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Subdirectory of the backup dir holding user-initiated archives
const MANUAL_BACKUP_SUBDIR: &str = "manual_backups";

/// Resolved dockhand settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the running-container snapshot is written
    pub state_file: PathBuf,

    /// Directory receiving volume archives
    pub backup_dir: PathBuf,

    /// Scheduled archives kept per volume (`<= 0` disables rotation)
    pub backup_rotation_count: i64,

    /// Manual archives kept per volume (`<= 0` disables rotation)
    pub manual_rotation_count: i64,

    /// Optional append-only log file
    pub log_file: Option<PathBuf>,

    /// Optional hook script invoked as `<script> <event> <detail>`
    pub hook_script: Option<PathBuf>,

    /// Volume access strategy
    pub access_mode: AccessMode,

    /// Host directory where the runtime keeps volume data
    pub volumes_root: PathBuf,

    /// Image used for helper containers
    pub helper_image: String,

    /// Mount point of the volume inside helper containers
    pub helper_mount_point: String,

    /// Container runtime CLI binary
    pub docker_binary: String,

    /// Gzip compression level (1-9)
    pub compression_level: u32,

    /// File the settings were loaded from, if any
    #[serde(skip)]
    pub source: Option<Utf8PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            state_file: data_dir.join("state.json"),
            backup_dir: data_dir.join("backups"),
            backup_rotation_count: DEFAULT_ROTATION_COUNT,
            manual_rotation_count: DEFAULT_MANUAL_ROTATION_COUNT,
            log_file: None,
            hook_script: None,
            access_mode: AccessMode::Auto,
            volumes_root: PathBuf::from("/var/lib/docker/volumes"),
            helper_image: "alpine".to_string(),
            helper_mount_point: "/data".to_string(),
            docker_binary: "docker".to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            source: None,
        }
    }
}

impl Settings {
    /// Load settings from the given path, or search the default locations.
    ///
    /// Search order without an explicit path: `./dockhand.yaml`,
    /// `<config dir>/dockhand/dockhand.yaml`, then built-in defaults.
    /// Environment overrides are applied last and the result is validated.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::find_config()? {
                Some(p) => Self::from_file(&p)?,
                None => {
                    debug!("No dockhand.yaml found, using defaults");
                    Self::default()
                }
            },
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a settings file without applying overrides
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        let mut settings = Self::from_yaml(&content)?;
        settings.source = Some(path.to_owned());
        debug!("Loaded settings from {}", path);
        Ok(settings)
    }

    /// Parse settings from YAML text; missing keys keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    fn find_config() -> Result<Option<Utf8PathBuf>> {
        let mut candidates = Vec::new();

        let cwd = std::env::current_dir().map_err(Error::Io)?;
        candidates.push(cwd);
        if let Some(dir) = default_config_dir() {
            candidates.push(dir);
        }

        for dir in candidates {
            for name in CONFIG_FILE_NAMES {
                let path = dir.join(name);
                if path.is_file() {
                    let path = Utf8PathBuf::try_from(path).map_err(|_| {
                        Error::invalid_config("Configuration path is not valid UTF-8")
                    })?;
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Apply `DOCKHAND_<KEY>` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            let name = format!("{}{}", ENV_PREFIX, key);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, v)) = var("STATE_FILE") {
            self.state_file = PathBuf::from(v);
        }
        if let Some((_, v)) = var("BACKUP_DIR") {
            self.backup_dir = PathBuf::from(v);
        }
        if let Some((name, v)) = var("BACKUP_ROTATION_COUNT") {
            self.backup_rotation_count = parse_env(&name, &v)?;
        }
        if let Some((name, v)) = var("MANUAL_ROTATION_COUNT") {
            self.manual_rotation_count = parse_env(&name, &v)?;
        }
        if let Some((_, v)) = var("LOG_FILE") {
            self.log_file = non_empty(v).map(PathBuf::from);
        }
        if let Some((_, v)) = var("HOOK_SCRIPT") {
            self.hook_script = non_empty(v).map(PathBuf::from);
        }
        if let Some((name, v)) = var("ACCESS_MODE") {
            self.access_mode = v
                .parse()
                .map_err(|_| Error::invalid_env(name.as_str(), v.as_str()))?;
        }
        if let Some((_, v)) = var("VOLUMES_ROOT") {
            self.volumes_root = PathBuf::from(v);
        }
        if let Some((_, v)) = var("HELPER_IMAGE") {
            self.helper_image = v;
        }
        if let Some((_, v)) = var("HELPER_MOUNT_POINT") {
            self.helper_mount_point = v;
        }
        if let Some((_, v)) = var("DOCKER_BINARY") {
            self.docker_binary = v;
        }
        if let Some((name, v)) = var("COMPRESSION_LEVEL") {
            self.compression_level = parse_env(&name, &v)?;
        }

        Ok(())
    }

    /// Clamp values that have a valid range instead of rejecting them
    pub fn normalize(&mut self) {
        self.compression_level = self.compression_level.clamp(1, 9);
        if self.helper_mount_point.len() > 1 {
            let trimmed = self.helper_mount_point.trim_end_matches('/');
            self.helper_mount_point = trimmed.to_string();
        }
    }

    /// Reject settings the core cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.state_file.as_os_str().is_empty() {
            return Err(Error::invalid_config("state_file must not be empty"));
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("backup_dir must not be empty"));
        }
        if self.helper_image.trim().is_empty() {
            return Err(Error::invalid_config("helper_image must not be empty"));
        }
        if !self.helper_mount_point.starts_with('/') || self.helper_mount_point == "/" {
            return Err(Error::invalid_config(format!(
                "helper_mount_point must be an absolute, non-root path (got '{}')",
                self.helper_mount_point
            )));
        }
        if self.docker_binary.trim().is_empty() {
            return Err(Error::invalid_config("docker_binary must not be empty"));
        }
        Ok(())
    }

    /// Directory holding user-initiated archives
    pub fn manual_backup_dir(&self) -> PathBuf {
        self.backup_dir.join(MANUAL_BACKUP_SUBDIR)
    }

    /// Resource guarded by the backup lock (`<backup_dir>.lock`)
    pub fn backup_lock_resource(&self) -> &Path {
        &self.backup_dir
    }

    /// Resource guarded by the state lock (`<state_file>.lock`)
    pub fn state_lock_resource(&self) -> &Path {
        &self.state_file
    }

    /// Render the effective settings as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_env(name, value))
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
