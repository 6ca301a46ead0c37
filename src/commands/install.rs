// src/commands/install.rs

//! Install command - acquire one package and its dependency closure

use super::{feeds, finish_run, max_concurrent, save_mode, settings_provider};
use crate::cli::SourceArgs;
use anyhow::Result;
use nupack::config::SettingsProvider;
use nupack::filesystem::path::absolutize;
use nupack::{
    Acquirer, CliProgress, DependencyBehavior, InstallPathResolver, PackageVersion,
    ResolutionPolicy, TargetMode,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Options of `nupack install` besides the package id
#[derive(Debug, Clone, Default)]
pub struct InstallOptions<'a> {
    pub version: Option<&'a str>,
    pub prerelease: bool,
    pub include_unlisted: bool,
    pub dependency_version: Option<&'a str>,
    pub output_directory: Option<&'a str>,
    pub solution_directory: Option<&'a str>,
    pub save_mode: Option<&'a str>,
}

/// Install a package into the resolved packages folder
pub async fn cmd_install(
    id: &str,
    options: InstallOptions<'_>,
    source: &SourceArgs,
    cancel: CancellationToken,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let version = options.version.map(PackageVersion::parse).transpose()?;

    let solution_dir = options.solution_directory.map(|d| absolutize(&cwd, d));
    let provider = settings_provider(source, &cwd);
    let install_dir = InstallPathResolver::new(&provider, &cwd).resolve(
        options.output_directory,
        &TargetMode::InstallOne {
            solution_dir: solution_dir.clone(),
        },
    )?;

    let settings = provider.load(solution_dir.as_deref().unwrap_or(&cwd))?;
    let behavior = match options.dependency_version {
        Some(value) => DependencyBehavior::parse(value)?,
        None => settings.dependency_behavior()?.unwrap_or_default(),
    };
    let policy = ResolutionPolicy::new(behavior)
        .with_prerelease(options.prerelease)
        .with_unlisted(options.include_unlisted);
    let save_mode = save_mode(options.save_mode, &settings)?;
    let sources = feeds(&settings, source, &cwd)?;

    info!(
        "Installing {} ({}) into {}",
        id,
        version
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "latest".to_string()),
        install_dir.display()
    );

    let progress = Arc::new(CliProgress::new());
    let acquirer = Acquirer::new(sources, install_dir)
        .with_save_mode(save_mode)
        .with_max_concurrent(max_concurrent(source, &settings))
        .with_progress(progress.clone())
        .with_cancellation(cancel);

    let result = acquirer.install(id, version, &policy).await;
    progress.finish();

    finish_run(result, "Installed")
}
