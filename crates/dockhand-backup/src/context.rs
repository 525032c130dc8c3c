//! Capabilities shared by every operation of one invocation

use crate::accessor::{select_accessor, VolumeAccessor};
use crate::notify::{HookNotifier, NoopNotifier, Notifier};
use dockhand_core::Settings;
use dockhand_runtime::ContainerRuntime;
use std::sync::Arc;
use std::time::Duration;

/// Longest wait for in-flight hook deliveries before the process exits
pub const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Built once at startup and passed by reference; there is no global state
#[derive(Clone)]
pub struct Context {
    pub settings: Arc<Settings>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub accessor: Arc<dyn VolumeAccessor>,
    pub notifier: Arc<dyn Notifier>,
}

impl Context {
    pub fn new(
        settings: Settings,
        runtime: Arc<dyn ContainerRuntime>,
        accessor: Arc<dyn VolumeAccessor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            runtime,
            accessor,
            notifier,
        }
    }

    /// Choose the accessor and notifier from settings
    pub fn from_settings(settings: Settings, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let accessor = select_accessor(&settings, Arc::clone(&runtime));
        let notifier: Arc<dyn Notifier> = match &settings.hook_script {
            Some(script) => Arc::new(HookNotifier::new(script)),
            None => Arc::new(NoopNotifier),
        };
        Self::new(settings, runtime, accessor, notifier)
    }

    /// Let pending notifications finish; call once before exiting
    pub async fn flush_notifications(&self) {
        self.notifier.flush(NOTIFY_DRAIN_TIMEOUT).await;
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("runtime", &self.runtime.name())
            .field("accessor", &self.accessor.name())
            .field("backup_dir", &self.settings.backup_dir)
            .finish()
    }
}
