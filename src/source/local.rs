// src/source/local.rs

//! Directory-backed package feed
//!
//! Two layouts are recognized, and may be mixed in the same directory:
//! - flat: `<root>/<id>.<version>.nupkg`
//! - hierarchical: `<root>/<id>/<version>/<id>.<version>.nupkg`
//!
//! File names are matched case-insensitively and versions are compared after
//! parsing, so `Foo.1.0.nupkg` serves a request for `foo 1.0.0`.

use super::feed::{FeedVersion, PackageFeed};
use crate::error::{Error, Result};
use crate::package::strip_name_prefix;
use crate::version::PackageVersion;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const ARCHIVE_EXTENSION: &str = ".nupkg";

/// Package feed reading archives from a local directory
pub struct LocalFeed {
    name: String,
    root: PathBuf,
}

impl LocalFeed {
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archives for `id` found under the root, with their parsed versions
    async fn find_archives(&self, id: &str) -> Result<Vec<(PackageVersion, PathBuf)>> {
        let root = self.root.clone();
        let id = id.to_string();
        let name = self.name.clone();

        tokio::task::spawn_blocking(move || scan(&name, &root, &id))
            .await
            .map_err(|e| Error::feed(&self.name, format!("directory scan aborted: {}", e)))?
    }
}

fn scan(name: &str, root: &Path, id: &str) -> Result<Vec<(PackageVersion, PathBuf)>> {
    if !root.is_dir() {
        return Err(Error::feed(
            name,
            format!("'{}' is not a directory", root.display()),
        ));
    }

    let mut found = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(3) {
        let entry = entry.map_err(|e| Error::feed(name, e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(version_text) = strip_name_prefix(&file_name, id).and_then(strip_extension) else {
            continue;
        };
        // "Foo.Bar.1.0.nupkg" also starts with "foo."; the leftover fails to parse
        if let Ok(version) = PackageVersion::parse(version_text) {
            found.push((version, entry.into_path()));
        }
    }

    Ok(found)
}

fn strip_extension(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(ARCHIVE_EXTENSION.len())?;
    let (stem, ext) = (name.get(..split)?, name.get(split..)?);
    ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION).then_some(stem)
}

#[async_trait]
impl PackageFeed for LocalFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_versions(&self, id: &str) -> Result<Vec<FeedVersion>> {
        let archives = self.find_archives(id).await?;
        debug!("Local feed '{}' has {} version(s) of {}", self.name, archives.len(), id);
        Ok(archives
            .into_iter()
            .map(|(version, _)| FeedVersion::listed(version))
            .collect())
    }

    async fn fetch(&self, id: &str, version: &PackageVersion) -> Result<Vec<u8>> {
        let archives = self.find_archives(id).await?;
        let Some((_, path)) = archives.into_iter().find(|(v, _)| v == version) else {
            return Err(Error::NotFound(format!("{} {} in '{}'", id, version, self.name)));
        };

        debug!("Reading {} from {}", id, path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::feed(&self.name, format!("failed to read '{}': {}", path.display(), e)))
    }
}
