//! Fire-and-forget event notification
//!
//! `notify` returns immediately. Whatever the notifier does with the event
//! happens in the background and cannot change an operation's result.
//! Before the process exits, [`Notifier::flush`] waits a bounded time for
//! deliveries still in flight so the last events are not lost.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Receives lifecycle events such as `pre_backup` or `backup_failed`
#[async_trait]
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &str, detail: &str);

    /// Wait up to `timeout` for deliveries still running
    async fn flush(&self, _timeout: Duration) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, event: &str, _detail: &str) {
        debug!("Event {} (no hook configured)", event);
    }
}

/// Runs `<script> <event> <detail>` in a background task per event.
///
/// `notify` never waits on the hook. Tasks are tracked only so
/// [`Notifier::flush`] can drain them at exit. Two events for the same
/// target may race; their relative completion order is not defined.
#[derive(Debug, Clone)]
pub struct HookNotifier {
    script: PathBuf,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl HookNotifier {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn script(&self) -> &PathBuf {
        &self.script
    }

    /// Hook invocations spawned and not yet reaped
    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Notifier for HookNotifier {
    fn notify(&self, event: &str, detail: &str) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Dropping event {}: no async runtime for hook", event);
                return;
            }
        };

        let script = self.script.clone();
        let event = event.to_string();
        let detail = detail.to_string();
        let delivery = async move {
            let output = Command::new(&script)
                .arg(&event)
                .arg(&detail)
                .stdin(Stdio::null())
                .output()
                .await;

            match output {
                Ok(out) if out.status.success() => {
                    debug!("Hook {} handled {}", script.display(), event);
                }
                Ok(out) => warn!(
                    "Hook {} failed for {} (exit status {:?}): {}",
                    script.display(),
                    event,
                    out.status.code(),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
                Err(e) => warn!("Failed to run hook {} for {}: {}", script.display(), event, e),
            }
        };

        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(delivery, &handle);
    }

    async fn flush(&self, timeout: Duration) {
        let mut pending = std::mem::take(&mut *self.tasks());
        if pending.is_empty() {
            return;
        }

        debug!("Waiting for {} hook invocations", pending.len());
        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                "{} hook invocations still running after {:?}, abandoning them",
                pending.len(),
                timeout
            );
        }
    }
}
