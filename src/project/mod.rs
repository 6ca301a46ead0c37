// src/project/mod.rs

//! Solution discovery, solution parsing and `packages.config` reading
//!
//! These are the collaborators that turn a path on disk into the ordered
//! list of [`Scope`](crate::reference::Scope)s the restore pipeline consumes.

mod discovery;
mod packages_config;
mod solution;

pub use discovery::{
    discover_solution, project_references_file, solution_scopes, PACKAGES_CONFIG,
    SOLUTION_CONFIG_DIR,
};
pub use packages_config::PackagesConfigReader;
pub use solution::{
    select_solution_parser, FilterSolutionParser, ProjectEntry, SolutionDescriptor,
    SolutionParser, TextSolutionParser,
};
