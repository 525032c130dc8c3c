//! Config command

use anyhow::Result;
use dockhand_core::Settings;

use crate::cli::{ConfigCommands, ConfigShowArgs};
use crate::output;

pub fn run(cmd: ConfigCommands, settings: Settings) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, &settings),
    }
}

fn show(args: ConfigShowArgs, settings: &Settings) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    match &settings.source {
        Some(path) => output::info(&format!("Loaded from {}", path)),
        None => output::info("No config file found, using defaults"),
    }
    print!("{}", settings.to_yaml()?);
    Ok(())
}
