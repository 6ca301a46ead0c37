// src/resolver/mod.rs

//! Version resolution
//!
//! The acquisition engine never decides versions itself. It hands the
//! candidate set gathered from feeds to a [`VersionResolver`] and acquires
//! whatever comes back. [`PolicyResolver`] is the default, driven purely by a
//! [`ResolutionPolicy`].

mod policy;

pub use policy::{select_version, DependencyBehavior, ResolutionPolicy};

use crate::source::FeedVersion;
use crate::version::{PackageVersion, VersionConstraint};

/// Narrow interface to whatever picks concrete versions
pub trait VersionResolver: Send + Sync {
    /// Choose one version among `candidates`, or `None` if nothing is acceptable
    fn select(
        &self,
        name: &str,
        candidates: &[FeedVersion],
        constraint: &VersionConstraint,
        policy: &ResolutionPolicy,
    ) -> Option<PackageVersion>;
}

/// Resolver that applies the policy's dependency behavior directly
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyResolver;

impl VersionResolver for PolicyResolver {
    fn select(
        &self,
        _name: &str,
        candidates: &[FeedVersion],
        constraint: &VersionConstraint,
        policy: &ResolutionPolicy,
    ) -> Option<PackageVersion> {
        select_version(candidates, constraint, policy)
    }
}
