// src/commands/mod.rs
//! Command handlers for the nupack CLI

mod install;
mod restore;
mod update;

pub use install::{cmd_install, InstallOptions};
pub use restore::cmd_restore;
pub use update::cmd_update_self;

use crate::cli::SourceArgs;
use anyhow::Result;
use nupack::config::{FileSettings, Settings};
use nupack::filesystem::path::absolutize;
use nupack::{RunResult, SaveMode, SourceTierSet};
use std::path::Path;

/// Settings provider honoring `--config-file`
fn settings_provider(args: &SourceArgs, cwd: &Path) -> FileSettings {
    match args.config_file.as_deref() {
        Some(file) => FileSettings::new().with_config_file(absolutize(cwd, file)),
        None => FileSettings::new(),
    }
}

/// Feeds for a run: `--source` values first, configured sources after
fn feeds(settings: &Settings, args: &SourceArgs, cwd: &Path) -> Result<SourceTierSet> {
    let sources = SourceTierSet::from_settings(settings, &args.sources, cwd)?;
    if sources.is_empty() {
        anyhow::bail!(
            "No package sources configured; pass --source or add one to nupack.toml"
        );
    }
    Ok(sources)
}

/// `--save-mode`, else the configured one, else the default
fn save_mode(option: Option<&str>, settings: &Settings) -> Result<SaveMode> {
    if let Some(mode) = option {
        return Ok(SaveMode::parse(mode)?);
    }
    Ok(settings.save_mode()?.unwrap_or_default())
}

fn max_concurrent(args: &SourceArgs, settings: &Settings) -> usize {
    args.max_concurrent.unwrap_or_else(|| settings.max_concurrent())
}

/// Print what a run did and turn its fatal error into the command's error
fn finish_run(result: RunResult, verb: &str) -> Result<()> {
    if result.restore_notice {
        println!(
            "Restored {} package(s). Packages missing from the packages folder are \
             downloaded automatically on restore.",
            result.installed_count
        );
    } else if result.installed_count > 0 {
        println!("{} {} package(s)", verb, result.installed_count);
    }

    match result.fatal_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
