// src/error.rs

//! Error types for the acquisition engine
//!
//! Every fallible operation in the library returns [`Result`]. Variants are
//! grouped the same way the restore pipeline treats them: configuration
//! problems abort before any I/O, feed problems are retried against other
//! feeds, and acquisition failures abort the run without undoing packages
//! already written.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Point in the self-update sequence where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// Querying the feed for the latest version
    Check,
    /// Downloading the new package into memory
    Download,
    /// Removing the stale backup or renaming the running executable
    Backup,
    /// Writing the new executable (a backup file exists at this point)
    Write,
}

impl UpdateStage {
    /// Whether a backup of the running executable may exist on disk
    pub fn backup_may_exist(self) -> bool {
        matches!(self, UpdateStage::Write)
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStage::Check => write!(f, "check"),
            UpdateStage::Download => write!(f, "download"),
            UpdateStage::Backup => write!(f, "backup"),
            UpdateStage::Write => write!(f, "write"),
        }
    }
}

/// One identity that no feed could satisfy
#[derive(Debug, Clone)]
pub struct AcquisitionFailure {
    /// Package name and version (or requested constraint) as displayed
    pub package: String,
    /// Why it failed, including every feed error seen
    pub reason: String,
}

impl fmt::Display for AcquisitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// No rule produced an install directory
    #[error("Cannot determine the packages folder: {0}")]
    NoInstallDirectory(String),

    /// Directory search found no solution file
    #[error("No solution file found in '{}'", .0.display())]
    SolutionNotFound(PathBuf),

    /// Directory search found more than one solution file
    #[error("Found multiple solution files in '{}': {}", dir.display(), format_paths(candidates))]
    AmbiguousSolution {
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// Invalid option value or combination
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// A settings file could not be parsed
    #[error("Failed to parse settings file '{}': {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// A scope's declared-references file could not be read
    #[error("Failed to read package references for '{scope}' from '{}': {reason}", path.display())]
    ScopeRead {
        scope: String,
        path: PathBuf,
        reason: String,
    },

    /// A declared-references file is malformed
    #[error("Malformed package references file '{}': {reason}", path.display())]
    References { path: PathBuf, reason: String },

    /// A single feed failed a single request
    #[error("Feed '{feed}' failed: {message}")]
    Feed { feed: String, message: String },

    /// The requested package or version does not exist on a feed
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more identities could not be acquired from any feed
    #[error("Failed to acquire {} package(s): {}", failures.len(), format_failures(failures))]
    Acquisition { failures: Vec<AcquisitionFailure> },

    /// Self-update failed at the given stage
    #[error("Self-update failed during {stage}: {message}")]
    SelfUpdate { stage: UpdateStage, message: String },

    /// The run was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Version text could not be parsed
    #[error("Invalid version '{input}': {reason}")]
    Version { input: String, reason: String },

    /// Package manifest is malformed or missing
    #[error("Invalid package manifest: {0}")]
    Manifest(String),

    /// Package archive is malformed
    #[error("Invalid package archive: {0}")]
    Archive(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Configuration errors are always fatal and precede any side effect
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::NoInstallDirectory(_)
                | Error::SolutionNotFound(_)
                | Error::AmbiguousSolution { .. }
                | Error::InvalidOption(_)
                | Error::ConfigParse { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// True for "this feed simply does not have it", as opposed to a feed failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub(crate) fn feed(feed: &str, message: impl Into<String>) -> Self {
        Error::Feed {
            feed: feed.to_string(),
            message: message.into(),
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_failures(failures: &[AcquisitionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
