// src/config/mod.rs

//! Settings lookup
//!
//! Settings live in `nupack.toml` files:
//!
//! ```toml
//! [config]
//! repository_path = "packages"
//! dependency_version = "HighestMinor"
//! save_mode = "nupkg;files"
//! max_concurrent = 8
//!
//! [[sources]]
//! name = "main"
//! url = "https://feed.example.org/flat"
//! tier = "primary"
//! ```
//!
//! Lookup starts at a directory and walks up to the filesystem root. The
//! nearest file wins for each key; the user-level file under the platform
//! config directory has the lowest precedence. Relative paths inside a file
//! are resolved against that file's directory.

use crate::acquire::SaveMode;
use crate::error::{Error, Result};
use crate::filesystem::path::{absolutize, normalize_separators};
use crate::resolver::DependencyBehavior;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file name searched for in each directory
pub const SETTINGS_FILE_NAME: &str = "nupack.toml";

/// Default number of packages acquired in parallel
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// On-disk layout of one settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// `[config]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    /// Packages folder, relative to the file's directory unless absolute
    pub repository_path: Option<String>,

    /// Default dependency behavior for `install`
    pub dependency_version: Option<String>,

    /// Which artifacts to keep per package (`nuspec;nupkg;files`)
    pub save_mode: Option<String>,

    /// Parallel acquisitions per run
    pub max_concurrent: Option<usize>,
}

/// Which tier a configured source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    #[default]
    Primary,
    Secondary,
}

/// `[[sources]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tier: SourceTier,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A configured feed after path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    /// HTTP(S) URL, or an absolute local directory
    pub location: String,
    pub tier: SourceTier,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, location: impl Into<String>, tier: SourceTier) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            tier,
        }
    }

    pub fn is_remote(&self) -> bool {
        is_remote_location(&self.location)
    }
}

/// Whether a source location names an HTTP feed rather than a directory
pub fn is_remote_location(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Settings merged from every file that applies to one directory
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub repository_path: Option<PathBuf>,
    pub dependency_version: Option<String>,
    pub save_mode: Option<String>,
    pub max_concurrent: Option<usize>,
    /// Enabled sources, nearest file first
    pub sources: Vec<SourceConfig>,
    /// Names disabled by a nearer file; they shadow same-named sources further away
    pub disabled_sources: Vec<String>,
}

impl Settings {
    /// Parse a settings file and merge it below what is already set
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file: SettingsFile = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        debug!("Merging settings from {}", path.display());
        self.merge(file, base);
        Ok(())
    }

    /// Merge a parsed file; keys already set are kept
    pub fn merge(&mut self, file: SettingsFile, base: &Path) {
        let config = file.config;
        if self.repository_path.is_none() {
            self.repository_path = config
                .repository_path
                .filter(|p| !p.trim().is_empty())
                .map(|p| absolutize(base, &p));
        }
        if self.dependency_version.is_none() {
            self.dependency_version = config.dependency_version;
        }
        if self.save_mode.is_none() {
            self.save_mode = config.save_mode;
        }
        if self.max_concurrent.is_none() {
            self.max_concurrent = config.max_concurrent;
        }

        for entry in file.sources {
            let seen = self
                .sources
                .iter()
                .map(|s| s.name.as_str())
                .chain(self.disabled_sources.iter().map(String::as_str))
                .any(|name| name.eq_ignore_ascii_case(&entry.name));
            if seen {
                continue;
            }
            if !entry.enabled {
                self.disabled_sources.push(entry.name);
                continue;
            }
            let location = if is_remote_location(&entry.url) {
                entry.url
            } else {
                absolutize(base, &entry.url).to_string_lossy().into_owned()
            };
            self.sources
                .push(SourceConfig::new(entry.name, location, entry.tier));
        }
    }

    /// Typed dependency behavior, if configured
    pub fn dependency_behavior(&self) -> Result<Option<DependencyBehavior>> {
        self.dependency_version
            .as_deref()
            .map(DependencyBehavior::parse)
            .transpose()
    }

    /// Typed save mode, if configured
    pub fn save_mode(&self) -> Result<Option<SaveMode>> {
        self.save_mode.as_deref().map(SaveMode::parse).transpose()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENT)
    }

    /// Packages folder with host separators
    pub fn repository_path(&self) -> Option<PathBuf> {
        self.repository_path
            .as_ref()
            .map(|p| normalize_separators(&p.to_string_lossy()))
    }
}

/// Narrow settings lookup used by the install-path resolver and commands
pub trait SettingsProvider: Send + Sync {
    /// Settings that apply to `dir`
    fn load(&self, dir: &Path) -> Result<Settings>;
}

/// Fixed settings, regardless of directory
impl SettingsProvider for Settings {
    fn load(&self, _dir: &Path) -> Result<Settings> {
        Ok(self.clone())
    }
}

/// Settings read from `nupack.toml` files on disk
#[derive(Debug, Clone)]
pub struct FileSettings {
    /// Replaces the directory walk when set
    config_file: Option<PathBuf>,
    /// Directory holding the user-level settings file
    user_dir: Option<PathBuf>,
}

impl FileSettings {
    pub fn new() -> Self {
        Self {
            config_file: None,
            user_dir: dirs::config_dir().map(|d| d.join("nupack")),
        }
    }

    /// Use one explicit file instead of the directory walk
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override (or disable) the user-level settings directory
    pub fn with_user_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.user_dir = dir;
        self
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsProvider for FileSettings {
    fn load(&self, dir: &Path) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(ref path) = self.config_file {
            settings.merge_file(path)?;
            return Ok(settings);
        }

        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };

        for ancestor in dir.ancestors() {
            let candidate = ancestor.join(SETTINGS_FILE_NAME);
            if candidate.is_file() {
                settings.merge_file(&candidate)?;
            }
        }

        if let Some(ref user_dir) = self.user_dir {
            let candidate = user_dir.join(SETTINGS_FILE_NAME);
            if candidate.is_file() {
                settings.merge_file(&candidate)?;
            }
        }

        Ok(settings)
    }
}
