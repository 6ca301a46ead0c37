// src/reference/missing.rs

//! Missing-set calculation against the packages folder

use super::aggregator::InstalledReferenceMap;
use crate::package::{strip_name_prefix, PackageIdentity, PackageReference};
use crate::version::PackageVersion;
use std::path::{Path, PathBuf};

/// "Is this identity already in the packages folder?"
pub trait InstallPresence: Send + Sync {
    fn is_present(&self, identity: &PackageIdentity) -> bool;
}

impl<F> InstallPresence for F
where
    F: Fn(&PackageIdentity) -> bool + Send + Sync,
{
    fn is_present(&self, identity: &PackageIdentity) -> bool {
        self(identity)
    }
}

/// Presence check against `<root>/<Id>.<Version>` directories
///
/// Names and versions are compared after normalization, so `foo.1.0`
/// on disk satisfies `Foo 1.0.0`. An identity without a version is present
/// when any version of it is installed.
#[derive(Debug, Clone)]
pub struct DirectoryPresence {
    root: PathBuf,
}

impl DirectoryPresence {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Every installed version of `name`
    pub fn installed_versions(&self, name: &str) -> Vec<PackageVersion> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| {
                let dir_name = entry.file_name().to_string_lossy().into_owned();
                let version = strip_name_prefix(&dir_name, name)?;
                PackageVersion::parse(version).ok()
            })
            .collect()
    }
}

impl InstallPresence for DirectoryPresence {
    fn is_present(&self, identity: &PackageIdentity) -> bool {
        let installed = self.installed_versions(identity.name());
        match identity.version() {
            Some(version) => installed.contains(version),
            None => !installed.is_empty(),
        }
    }
}

/// References absent from the packages folder, with their declaring scopes
///
/// Always computed from scratch from a map and the current on-disk state.
#[derive(Debug, Clone, Default)]
pub struct MissingSet {
    entries: Vec<(PackageReference, Vec<String>)>,
}

impl MissingSet {
    pub fn compute(map: &InstalledReferenceMap, presence: &dyn InstallPresence) -> Self {
        let entries = map
            .iter()
            .filter(|(reference, _)| !presence.is_present(&reference.identity))
            .map(|(reference, scopes)| (reference.clone(), scopes.to_vec()))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageReference, &[String])> {
        self.entries.iter().map(|(r, s)| (r, s.as_slice()))
    }

    pub fn references(&self) -> impl Iterator<Item = &PackageReference> {
        self.entries.iter().map(|(r, _)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exact(name: &str, version: &str) -> PackageReference {
        PackageReference::exact(name, PackageVersion::parse(version).unwrap())
    }

    #[test]
    fn test_missing_excludes_present() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("foo.1.0")).unwrap();
        std::fs::write(temp.path().join("Bar.2.0.0"), b"not a directory").unwrap();

        let map = InstalledReferenceMap::aggregate(vec![
            ("A", vec![exact("Foo", "1.0.0"), exact("Bar", "2.0")]),
            ("B", vec![exact("Bar", "2.0"), PackageReference::latest("Foo")]),
        ]);

        let missing = MissingSet::compute(&map, &DirectoryPresence::new(temp.path()));
        let names: Vec<_> = missing.references().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["Bar 2.0.0"]);
        assert_eq!(missing.iter().next().unwrap().1, &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_mixed_case_prerelease_is_present() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("Foo.1.0.0-Beta")).unwrap();
        let presence = DirectoryPresence::new(temp.path());

        assert_eq!(presence.installed_versions("foo")[0].to_string(), "1.0.0-Beta");
        let map = InstalledReferenceMap::aggregate(vec![
            ("A", vec![exact("Foo", "1.0.0-Beta"), exact("foo", "1.0.0-beta")]),
        ]);
        assert!(MissingSet::compute(&map, &presence).is_empty());
    }

    #[test]
    fn test_empty_map_is_empty_set() {
        let missing = MissingSet::compute(&InstalledReferenceMap::new(), &|_: &PackageIdentity| false);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_missing_root_means_nothing_installed() {
        let temp = TempDir::new().unwrap();
        let presence = DirectoryPresence::new(temp.path().join("packages"));
        assert!(presence.installed_versions("Foo").is_empty());
        assert!(!presence.is_present(&PackageIdentity::new("Foo", None)));
    }
}
