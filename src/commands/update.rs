// src/commands/update.rs

//! `update --self` - replace the running executable with the latest release

use super::{feeds, settings_provider};
use crate::cli::SourceArgs;
use anyhow::{Context, Result};
use nupack::config::SettingsProvider;
use nupack::self_update::running_version;
use nupack::{LogProgress, SelfUpdater, UpdateOutcome};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn cmd_update_self(source: &SourceArgs, cancel: CancellationToken) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = settings_provider(source, &cwd).load(&cwd)?;
    let feed = feeds(&settings, source, &cwd)?
        .primary_feed()
        .context("Self-update needs a primary package source")?;
    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    let updater = SelfUpdater::new(feed, exe)
        .with_progress(Arc::new(LogProgress))
        .with_cancellation(cancel);

    match updater.update(running_version()).await {
        UpdateOutcome::UpToDate { version } => {
            println!("nupack is up to date ({})", version);
            Ok(())
        }
        UpdateOutcome::Updated { from, to } => {
            match from {
                Some(from) => println!("Updated nupack from {} to {}", from, to),
                None => println!("Updated nupack to {}", to),
            }
            Ok(())
        }
        UpdateOutcome::Failed(e) => Err(e.into()),
    }
}
