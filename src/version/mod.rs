// src/version/mod.rs

//! Version handling and constraint satisfaction for package references
//!
//! Package versions follow semantic-version precedence with two relaxations
//! common in package feeds: missing minor/patch components default to zero,
//! and an optional fourth numeric "revision" component is accepted. Build
//! metadata is parsed but never affects equality or ordering. Pre-release
//! labels compare case-insensitively but keep their spelling for display.

use crate::error::{Error, Result};
use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed package version
#[derive(Debug, Clone)]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    pre: Prerelease,
    /// Lowercased `pre`, used for equality, ordering and hashing
    pre_key: Prerelease,
    build: BuildMetadata,
}

impl PackageVersion {
    /// Create a release version from three components
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            pre: Prerelease::EMPTY,
            pre_key: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Parse a version string
    ///
    /// Examples:
    /// - "1" → 1.0.0
    /// - "1.2" → 1.2.0
    /// - "v1.2.3-beta.1" → 1.2.3-beta.1
    /// - "1.2.3.4" → 1.2.3.4 (revision 4)
    /// - "1.2.3+sha.abc" → 1.2.3 (metadata ignored for comparison)
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Version {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let text = s.trim();
        let text = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);

        if text.is_empty() {
            return Err(invalid("empty version"));
        }

        let (rest, build) = match text.split_once('+') {
            Some((r, b)) => (r, b),
            None => (text, ""),
        };
        let (release, pre) = match rest.split_once('-') {
            Some((r, p)) => (r, p),
            None => (rest, ""),
        };

        let parts: Vec<&str> = release.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid("expected between one and four numeric components"));
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse::<u64>()
                .map_err(|_| invalid(&format!("'{}' is not a number", part)))?;
        }

        let pre_key =
            Prerelease::new(&pre.to_ascii_lowercase()).map_err(|e| invalid(&e.to_string()))?;
        let pre = Prerelease::new(pre).map_err(|e| invalid(&e.to_string()))?;
        let build = BuildMetadata::new(build).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            pre,
            pre_key,
            build,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// Whether this version carries a pre-release tag
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    fn release_key(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.release_key().hash(state);
        self.pre_key.hash(state);
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Prerelease ordering follows semver: a release sorts above any of its prereleases
        self.release_key()
            .cmp(&other.release_key())
            .then_with(|| self.pre_key.cmp(&other.pre_key))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Version constraint operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any version is acceptable
    Any,
    /// Exact version match
    Exact(PackageVersion),
    /// Greater than
    GreaterThan(PackageVersion),
    /// Greater than or equal
    GreaterOrEqual(PackageVersion),
    /// Less than
    LessThan(PackageVersion),
    /// Less than or equal
    LessOrEqual(PackageVersion),
    /// Both constraints must be satisfied (for ranges like ">= 1.0, < 2.0")
    And(Box<VersionConstraint>, Box<VersionConstraint>),
}

impl VersionConstraint {
    /// Parse a version constraint string
    ///
    /// Accepts interval notation and operator syntax:
    /// - "[1.0]" → Exact(1.0.0)
    /// - "[1.0,2.0)" → >= 1.0.0, < 2.0.0
    /// - "(,2.0]" → <= 2.0.0
    /// - ">= 1.2, < 2" → >= 1.2.0, < 2.0.0
    /// - "1.0" → GreaterOrEqual(1.0.0)
    /// - "" or "*" → Any
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(VersionConstraint::Any);
        }

        if s.starts_with('[') || s.starts_with('(') {
            return Self::parse_interval(s);
        }

        // Compound operator constraints (e.g., ">= 1.0, < 2.0")
        if let Some((left, right)) = s.split_once(',') {
            let left = Self::parse(left)?;
            let right = Self::parse(right)?;
            return Ok(VersionConstraint::And(Box::new(left), Box::new(right)));
        }

        if let Some(rest) = s.strip_prefix(">=") {
            Ok(VersionConstraint::GreaterOrEqual(PackageVersion::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(VersionConstraint::LessOrEqual(PackageVersion::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix('>') {
            Ok(VersionConstraint::GreaterThan(PackageVersion::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix('<') {
            Ok(VersionConstraint::LessThan(PackageVersion::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(VersionConstraint::Exact(PackageVersion::parse(rest)?))
        } else {
            // A bare version is a minimum, as in feed dependency declarations
            Ok(VersionConstraint::GreaterOrEqual(PackageVersion::parse(s)?))
        }
    }

    fn parse_interval(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Version {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let min_inclusive = s.starts_with('[');
        let max_inclusive = s.ends_with(']');
        if !(s.ends_with(']') || s.ends_with(')')) || s.len() < 2 {
            return Err(invalid("unterminated interval"));
        }
        let body = &s[1..s.len() - 1];

        let Some((low, high)) = body.split_once(',') else {
            // "[1.0]" is the only valid single-value interval
            if min_inclusive && max_inclusive {
                return Ok(VersionConstraint::Exact(PackageVersion::parse(body)?));
            }
            return Err(invalid("single-value interval must be inclusive"));
        };

        let low = low.trim();
        let high = high.trim();
        let lower = if low.is_empty() {
            None
        } else if min_inclusive {
            Some(VersionConstraint::GreaterOrEqual(PackageVersion::parse(low)?))
        } else {
            Some(VersionConstraint::GreaterThan(PackageVersion::parse(low)?))
        };
        let upper = if high.is_empty() {
            None
        } else if max_inclusive {
            Some(VersionConstraint::LessOrEqual(PackageVersion::parse(high)?))
        } else {
            Some(VersionConstraint::LessThan(PackageVersion::parse(high)?))
        };

        match (lower, upper) {
            (Some(l), Some(u)) => Ok(VersionConstraint::And(Box::new(l), Box::new(u))),
            (Some(c), None) | (None, Some(c)) => Ok(c),
            (None, None) => Err(invalid("interval has no bounds")),
        }
    }

    /// Check if a version satisfies this constraint
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => version == v,
            VersionConstraint::GreaterThan(v) => version > v,
            VersionConstraint::GreaterOrEqual(v) => version >= v,
            VersionConstraint::LessThan(v) => version < v,
            VersionConstraint::LessOrEqual(v) => version <= v,
            VersionConstraint::And(left, right) => {
                left.satisfies(version) && right.satisfies(version)
            }
        }
    }

    /// The single version this constraint pins, if any
    pub fn pinned(&self) -> Option<&PackageVersion> {
        match self {
            VersionConstraint::Exact(v) => Some(v),
            _ => None,
        }
    }

    /// Whether any bound of this constraint is itself a pre-release
    ///
    /// A constraint written against a pre-release opts into pre-release
    /// candidates even when the policy excludes them.
    pub fn mentions_prerelease(&self) -> bool {
        match self {
            VersionConstraint::Any => false,
            VersionConstraint::Exact(v)
            | VersionConstraint::GreaterThan(v)
            | VersionConstraint::GreaterOrEqual(v)
            | VersionConstraint::LessThan(v)
            | VersionConstraint::LessOrEqual(v) => v.is_prerelease(),
            VersionConstraint::And(left, right) => {
                left.mentions_prerelease() || right.mentions_prerelease()
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Exact(v) => write!(f, "= {}", v),
            VersionConstraint::GreaterThan(v) => write!(f, "> {}", v),
            VersionConstraint::GreaterOrEqual(v) => write!(f, ">= {}", v),
            VersionConstraint::LessThan(v) => write!(f, "< {}", v),
            VersionConstraint::LessOrEqual(v) => write!(f, "<= {}", v),
            VersionConstraint::And(left, right) => write!(f, "{}, {}", left, right),
        }
    }
}
