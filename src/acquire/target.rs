// src/acquire/target.rs

//! Install-path resolution
//!
//! Precedence, first match wins:
//! 1. an explicit output directory, if non-empty
//! 2. solution mode: the settings `repository_path` for the solution's
//!    directory, else `<solution dir>/packages`
//! 3. single-scope mode: the same lookup, only when a solution directory was
//!    given explicitly
//! 4. install-one mode only: the settings for the working directory, else the
//!    working directory itself
//!
//! Anything else is `Error::NoInstallDirectory`, raised before any download.

use crate::config::SettingsProvider;
use crate::error::{Error, Result};
use crate::filesystem::path::absolutize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Folder name used under a solution directory when settings are silent
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

/// What kind of run the directory is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// Restoring every scope of a solution
    Solution { solution_dir: PathBuf },
    /// Restoring one explicitly named references file
    SingleScope { solution_dir: Option<PathBuf> },
    /// Installing one package by id
    InstallOne { solution_dir: Option<PathBuf> },
}

/// Resolves the packages folder for a run
pub struct InstallPathResolver<'a> {
    settings: &'a dyn SettingsProvider,
    cwd: PathBuf,
}

impl<'a> InstallPathResolver<'a> {
    pub fn new(settings: &'a dyn SettingsProvider, cwd: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            cwd: cwd.into(),
        }
    }

    pub fn resolve(&self, explicit: Option<&str>, mode: &TargetMode) -> Result<PathBuf> {
        if let Some(dir) = explicit.map(str::trim).filter(|d| !d.is_empty()) {
            let path = absolutize(&self.cwd, dir);
            debug!("Packages folder from option: {}", path.display());
            return Ok(path);
        }

        match mode {
            TargetMode::Solution { solution_dir } => self.from_solution_dir(solution_dir),
            TargetMode::SingleScope {
                solution_dir: Some(dir),
            } => self.from_solution_dir(dir),
            TargetMode::SingleScope { solution_dir: None } => Err(Error::NoInstallDirectory(
                "pass --packages-directory or --solution-directory".to_string(),
            )),
            TargetMode::InstallOne {
                solution_dir: Some(dir),
            } => self.from_solution_dir(dir),
            TargetMode::InstallOne { solution_dir: None } => {
                let settings = self.settings.load(&self.cwd)?;
                Ok(settings
                    .repository_path()
                    .unwrap_or_else(|| self.cwd.clone()))
            }
        }
    }

    fn from_solution_dir(&self, dir: &Path) -> Result<PathBuf> {
        let dir = absolutize(&self.cwd, &dir.to_string_lossy());
        let settings = self.settings.load(&dir)?;
        let path = settings
            .repository_path()
            .unwrap_or_else(|| dir.join(DEFAULT_PACKAGES_DIR));
        debug!("Packages folder for {}: {}", dir.display(), path.display());
        Ok(path)
    }
}
