// src/commands/restore.rs

//! Restore command - install every declared package that is missing
//!
//! The target is a solution file, a directory holding exactly one solution,
//! or a single `packages.config`. Everything that can fail for configuration
//! reasons (solution discovery, packages folder, options) is settled before
//! the first download.

use super::{feeds, finish_run, max_concurrent, save_mode, settings_provider};
use crate::cli::SourceArgs;
use anyhow::Result;
use nupack::config::SettingsProvider;
use nupack::filesystem::path::absolutize;
use nupack::project::{discover_solution, select_solution_parser, solution_scopes, PackagesConfigReader};
use nupack::{Acquirer, CliProgress, Error, InstallPathResolver, Scope, ScopeMode, TargetMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the restore target turned out to be
#[derive(Debug)]
struct RestorePlan {
    scopes: Vec<Scope>,
    mode: ScopeMode,
    target: TargetMode,
    /// Directory whose settings apply to this run
    settings_dir: PathBuf,
}

/// A `.config` path names one references file, whether or not it exists
fn is_references_file(path: &Path) -> bool {
    !path.is_dir()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("config"))
}

fn plan(path: &Path, solution_directory: Option<PathBuf>) -> Result<RestorePlan> {
    if is_references_file(path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !path.is_file() {
            return Err(Error::ScopeRead {
                scope: name,
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            }
            .into());
        }
        let settings_dir = solution_directory
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        return Ok(RestorePlan {
            scopes: vec![Scope::new(name, path)],
            mode: ScopeMode::Single,
            target: TargetMode::SingleScope {
                solution_dir: solution_directory,
            },
            settings_dir,
        });
    }

    let solution_file = discover_solution(path)?;
    let solution = select_solution_parser(&solution_file).parse(&solution_file)?;
    info!(
        "Solution {} lists {} project(s)",
        solution.path.display(),
        solution.projects.len()
    );

    let solution_dir = solution_directory.unwrap_or_else(|| solution.directory().to_path_buf());
    Ok(RestorePlan {
        scopes: solution_scopes(&solution),
        mode: ScopeMode::Aggregate,
        target: TargetMode::Solution {
            solution_dir: solution_dir.clone(),
        },
        settings_dir: solution_dir,
    })
}

/// Restore missing packages for a solution or one packages.config
pub async fn cmd_restore(
    path: Option<&str>,
    packages_directory: Option<&str>,
    solution_directory: Option<&str>,
    save_mode_option: Option<&str>,
    source: &SourceArgs,
    cancel: CancellationToken,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let target = path.map(|p| absolutize(&cwd, p)).unwrap_or_else(|| cwd.clone());
    let solution_directory = solution_directory.map(|d| absolutize(&cwd, d));

    let plan = plan(&target, solution_directory)?;
    let provider = settings_provider(source, &cwd);
    let install_dir =
        InstallPathResolver::new(&provider, &cwd).resolve(packages_directory, &plan.target)?;

    let settings = provider.load(&plan.settings_dir)?;
    let save_mode = save_mode(save_mode_option, &settings)?;
    let sources = feeds(&settings, source, &cwd)?;
    debug!(
        "Restoring {} scope(s) into {} (save mode {})",
        plan.scopes.len(),
        install_dir.display(),
        save_mode
    );

    let progress = Arc::new(CliProgress::new());
    let acquirer = Acquirer::new(sources, install_dir)
        .with_save_mode(save_mode)
        .with_max_concurrent(max_concurrent(source, &settings))
        .with_progress(progress.clone())
        .with_cancellation(cancel);

    let result = acquirer
        .restore(&plan.scopes, &PackagesConfigReader, plan.mode)
        .await;
    progress.finish();

    finish_run(result, "Restored")
}
