// src/lib.rs

//! NuPack package acquisition engine
//!
//! Restores the packages a solution's projects declare, installs single
//! packages with their dependencies, and updates the tool itself.
//!
//! # Architecture
//!
//! - References: every scope's `packages.config` is folded into one map,
//!   and the entries with no `<Id>.<Version>` folder form the missing set
//! - Sources: feeds come in two tiers; secondary feeds are asked only when
//!   the primary tier has nothing usable
//! - Acquisition: concurrent, at most once per identity per run, staged
//!   writes renamed into place
//! - Self-update: the same fetch, followed by a rename-then-write swap of
//!   the running executable

pub mod acquire;
pub mod config;
mod error;
pub mod filesystem;
pub mod package;
pub mod progress;
pub mod project;
pub mod reference;
pub mod resolver;
pub mod self_update;
pub mod source;
pub mod version;

pub use acquire::{Acquirer, InstallPathResolver, RunResult, SaveMode, TargetMode};
pub use config::{FileSettings, Settings, SettingsProvider};
pub use error::{AcquisitionFailure, Error, Result, UpdateStage};
pub use package::{PackageIdentity, PackageReference};
pub use progress::{CallbackProgress, CliProgress, LogProgress, ProgressEvent, ProgressSink, SilentProgress};
pub use reference::{InstalledReferenceMap, MissingSet, Scope, ScopeMode};
pub use resolver::{DependencyBehavior, ResolutionPolicy};
pub use self_update::{SelfUpdater, UpdateOutcome};
pub use source::{HttpFeed, LocalFeed, PackageFeed, SourceTierSet};
pub use version::{PackageVersion, VersionConstraint};
