// src/resolver/policy.rs

//! Resolution policy and candidate version selection

use crate::error::{Error, Result};
use crate::source::FeedVersion;
use crate::version::{PackageVersion, VersionConstraint};
use strum_macros::{Display, EnumString};

/// How an unpinned reference is turned into one concrete version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DependencyBehavior {
    /// Minimum satisfying candidate
    #[default]
    Lowest,
    /// Maximum satisfying candidate
    Highest,
    /// Maximum within the lowest candidate's major version
    HighestMinor,
    /// Maximum within the lowest candidate's major.minor version
    HighestPatch,
    /// Maximum satisfying candidate, and no dependency closure at all
    Ignore,
}

impl DependencyBehavior {
    /// Parse a behavior name (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        s.trim().parse().map_err(|_| {
            Error::InvalidOption(format!(
                "unknown dependency behavior '{}' (expected Lowest, Highest, HighestMinor, HighestPatch or Ignore)",
                s
            ))
        })
    }

    /// Whether manifest dependencies are acquired along with the package
    pub fn expands_dependencies(self) -> bool {
        self != DependencyBehavior::Ignore
    }
}

/// Rules for choosing among candidate versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionPolicy {
    pub dependency_behavior: DependencyBehavior,
    pub include_prerelease: bool,
    pub include_unlisted: bool,
}

impl ResolutionPolicy {
    pub fn new(dependency_behavior: DependencyBehavior) -> Self {
        Self {
            dependency_behavior,
            ..Default::default()
        }
    }

    /// Policy used by restore: declared identities only, newest acceptable version
    pub fn restore() -> Self {
        Self::new(DependencyBehavior::Ignore)
    }

    pub fn with_prerelease(mut self, include: bool) -> Self {
        self.include_prerelease = include;
        self
    }

    pub fn with_unlisted(mut self, include: bool) -> Self {
        self.include_unlisted = include;
        self
    }
}

/// Pick one version from feed candidates
///
/// Candidates that do not satisfy `constraint` are dropped first. Pre-release
/// candidates survive only if the policy allows them or the constraint itself
/// names a pre-release; unlisted candidates survive only if the policy allows
/// them or the constraint pins that exact version.
pub fn select_version(
    candidates: &[FeedVersion],
    constraint: &VersionConstraint,
    policy: &ResolutionPolicy,
) -> Option<PackageVersion> {
    let allow_prerelease = policy.include_prerelease || constraint.mentions_prerelease();
    let pinned = constraint.pinned();

    let mut eligible: Vec<&PackageVersion> = candidates
        .iter()
        .filter(|c| constraint.satisfies(&c.version))
        .filter(|c| c.listed || policy.include_unlisted || pinned.is_some())
        .filter(|c| allow_prerelease || !c.version.is_prerelease())
        .map(|c| &c.version)
        .collect();
    eligible.sort();
    eligible.dedup();

    let lowest = *eligible.first()?;
    let chosen = match policy.dependency_behavior {
        DependencyBehavior::Lowest => lowest,
        DependencyBehavior::Highest | DependencyBehavior::Ignore => *eligible.last()?,
        DependencyBehavior::HighestMinor => *eligible
            .iter()
            .rev()
            .find(|v| v.major() == lowest.major())?,
        DependencyBehavior::HighestPatch => *eligible
            .iter()
            .rev()
            .find(|v| v.major() == lowest.major() && v.minor() == lowest.minor())?,
    };

    Some(chosen.clone())
}
