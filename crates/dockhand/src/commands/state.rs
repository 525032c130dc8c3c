//! Container state commands: save, restore, autostop and autostart

use anyhow::Result;
use dockhand_backup::{Operation, Orchestrator};
use dockhand_core::Settings;

use super::{complete, connect, finish};
use crate::output;

pub async fn save(settings: Settings) -> Result<()> {
    output::header("Save Running Containers");
    output::kv("State file", &settings.state_file.display().to_string());

    let ctx = connect(settings, Operation::Save).await?;
    let result = Orchestrator::new(&ctx).save().await;
    complete(&ctx, result).await
}

pub async fn restore(settings: Settings) -> Result<()> {
    output::header("Restore Containers");
    output::kv("State file", &settings.state_file.display().to_string());

    let ctx = connect(settings, Operation::StateRestore).await?;
    let spinner = output::spinner("Starting containers...");
    let result = Orchestrator::new(&ctx).restore_state().await;
    spinner.finish_and_clear();

    complete(&ctx, result).await
}

pub async fn autostop(settings: Settings) -> Result<()> {
    output::header("Stop Autostop Containers");

    let ctx = connect(settings, Operation::Autostop).await?;
    let report = Orchestrator::new(&ctx).autostop().await?;
    if report.total() == 0 {
        output::info("No running containers are labelled autostop=true");
        return Ok(());
    }
    finish(&report)
}

pub async fn autostart(settings: Settings) -> Result<()> {
    output::header("Start Autostart Containers");

    let ctx = connect(settings, Operation::Autostart).await?;
    let report = Orchestrator::new(&ctx).autostart().await?;
    if report.total() == 0 {
        output::info("No stopped containers are labelled autostart=true");
        return Ok(());
    }
    finish(&report)
}
