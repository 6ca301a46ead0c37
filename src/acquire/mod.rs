// src/acquire/mod.rs

//! Package acquisition
//!
//! - [`InstallPathResolver`]: where packages go
//! - [`Acquirer`]: resolve, fetch and extract, concurrently and deduplicated
//! - [`PackageExtractor`]: staged writes into `<Id>.<Version>/` per [`SaveMode`]

mod coalesce;
mod extract;
mod orchestrator;
mod result;
mod target;

pub use coalesce::Coalescer;
pub use extract::{Extracted, PackageExtractor, SaveMode};
pub use orchestrator::Acquirer;
pub use result::RunResult;
pub use target::{InstallPathResolver, TargetMode, DEFAULT_PACKAGES_DIR};
