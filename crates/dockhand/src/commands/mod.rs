//! CLI command implementations

pub mod backup;
pub mod config;
pub mod restore;
pub mod state;

use anyhow::{bail, Result};
use dockhand_backup::{Context, Operation, OperationError, OperationReport};
use dockhand_core::Settings;
use dockhand_runtime::DockerCli;
use std::sync::Arc;
use tracing::debug;

use crate::output;

/// Build the capability context, failing fast when the runtime is unreachable
pub async fn connect(settings: Settings, operation: Operation) -> Result<Context> {
    let runtime = DockerCli::with_binary(&settings.docker_binary);
    let version = runtime
        .check_available()
        .await
        .map_err(|e| OperationError::enumeration(operation.as_str(), e))?;
    debug!("{} server version {}", runtime.binary(), version);

    Ok(Context::from_settings(settings, Arc::new(runtime)))
}

/// Context for commands that never talk to the runtime
pub fn offline(settings: Settings) -> Context {
    let runtime = DockerCli::with_binary(&settings.docker_binary);
    Context::from_settings(settings, Arc::new(runtime))
}

/// Wait for in-flight hook deliveries, then print the report.
///
/// Runs on error paths too, since aborts send a `<op>_failed` event.
pub async fn complete(
    ctx: &Context,
    result: std::result::Result<OperationReport, OperationError>,
) -> Result<()> {
    ctx.flush_notifications().await;
    finish(&result?)
}

/// Print a report; any item failure turns into a non-zero exit
pub fn finish(report: &OperationReport) -> Result<()> {
    output::report(report);
    if !report.is_success() {
        bail!(
            "{} finished with {} of {} items failed",
            report.operation,
            report.failed,
            report.total()
        );
    }
    Ok(())
}
