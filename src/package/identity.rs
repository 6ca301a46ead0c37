// src/package/identity.rs

//! Package identities and declared references

use crate::version::{PackageVersion, VersionConstraint};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-folded package name, the one rule used for every name lookup
pub fn fold_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Text after `<name>.` when `text` starts with `name` in any case
///
/// The remainder keeps its original spelling, so version labels survive.
pub fn strip_name_prefix<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let head = text.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    text[name.len()..].strip_prefix('.')
}

/// A package's (name, version) key
///
/// Names compare case-insensitively; the original spelling is kept for
/// display and directory naming. A missing version means "not yet resolved".
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    name: String,
    version: Option<PackageVersion>,
}

impl PackageIdentity {
    pub fn new(name: impl Into<String>, version: Option<PackageVersion>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Identity with a concrete version
    pub fn concrete(name: impl Into<String>, version: PackageVersion) -> Self {
        Self::new(name, Some(version))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&PackageVersion> {
        self.version.as_ref()
    }

    /// Lowercased name used for feed URLs and lookups
    pub fn lower_name(&self) -> String {
        fold_name(&self.name)
    }

    /// Key for per-run maps; equal identities produce equal keys
    pub fn key(&self) -> String {
        match &self.version {
            Some(v) => format!("{} {}", self.lower_name(), v.to_string().to_ascii_lowercase()),
            None => self.lower_name(),
        }
    }

    /// Per-package directory name inside the packages folder (`Name.1.2.3`)
    ///
    /// Only concrete identities have a directory.
    pub fn directory_name(&self) -> Option<String> {
        self.version
            .as_ref()
            .map(|v| format!("{}.{}", self.name, v))
    }

    /// Archive file name (`Name.1.2.3.nupkg`)
    pub fn archive_name(&self) -> Option<String> {
        self.directory_name().map(|d| format!("{}.nupkg", d))
    }

    /// Whether `other` names the same package, ignoring version
    pub fn same_package(&self, other: &PackageIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.same_package(other) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.name.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        self.version.hash(state);
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.name.bytes().map(|b| b.to_ascii_lowercase());
        let b = other.name.bytes().map(|b| b.to_ascii_lowercase());
        a.cmp(b).then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A package reference declared by a scope
///
/// Equality and hashing consider only the identity: two declarations of the
/// same name and version are the same installed entry even if they carry
/// different allowed-version ranges.
#[derive(Debug, Clone)]
pub struct PackageReference {
    pub identity: PackageIdentity,
    /// Range restricting which versions may be chosen (`allowedVersions`)
    pub allowed_versions: Option<VersionConstraint>,
}

impl PackageReference {
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            allowed_versions: None,
        }
    }

    /// Reference to a specific version
    pub fn exact(name: impl Into<String>, version: PackageVersion) -> Self {
        Self::new(PackageIdentity::concrete(name, version))
    }

    /// Reference to whatever the latest acceptable version is
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(PackageIdentity::new(name, None))
    }

    pub fn with_allowed_versions(mut self, constraint: VersionConstraint) -> Self {
        self.allowed_versions = Some(constraint);
        self
    }

    /// Constraint used when picking a version from feed candidates
    pub fn constraint(&self) -> VersionConstraint {
        match (self.identity.version(), &self.allowed_versions) {
            (Some(v), _) => VersionConstraint::Exact(v.clone()),
            (None, Some(c)) => c.clone(),
            (None, None) => VersionConstraint::Any,
        }
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)
    }
}

impl PartialEq for PackageReference {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for PackageReference {}

impl Hash for PackageReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}
