// src/reference/mod.rs

//! Declared-reference aggregation and missing-set calculation

mod aggregator;
mod missing;

pub use aggregator::{
    load_scopes, InstalledReferenceMap, ReferenceReader, Scope, ScopeLoad, ScopeMode,
};
pub use missing::{DirectoryPresence, InstallPresence, MissingSet};
