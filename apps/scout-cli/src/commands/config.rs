//! Config file commands.

use anyhow::{bail, Context, Result};
use scout_sync::ScoutConfig;
use std::path::PathBuf;

use crate::cli::ConfigCommand;

pub fn run(command: &ConfigCommand, path: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = ScoutConfig::load(path)?;
            print!("{}", toml_string(&config)?);
            Ok(())
        }
        ConfigCommand::Init { force } => {
            let target = path
                .or_else(ScoutConfig::default_config_path)
                .context("Could not determine config directory")?;
            if target.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", target.display());
            }
            // Loading first keeps environment overrides in the written file.
            let config = ScoutConfig::load_or_default(Some(target.clone()));
            let written = config.save(Some(target))?;
            println!("{}", written.display());
            Ok(())
        }
    }
}

fn toml_string(config: &ScoutConfig) -> Result<String> {
    let mut config = config.clone();
    // Never echo credentials.
    if config.api.token.is_some() {
        config.api.token = Some("<redacted>".to_string());
    }
    Ok(toml::to_string_pretty(&config)?)
}
