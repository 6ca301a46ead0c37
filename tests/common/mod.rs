// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nupack::package::{pack, PackageManifest};
use nupack::source::FeedVersion;
use nupack::version::{PackageVersion, VersionConstraint};
use nupack::{Error, PackageFeed, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn v(s: &str) -> PackageVersion {
    PackageVersion::parse(s).unwrap()
}

/// Archive bytes for `id` at `version` with one payload file
pub fn archive(id: &str, version: &str) -> Vec<u8> {
    archive_with_deps(id, version, &[])
}

/// Archive bytes whose manifest lists `(id, constraint)` dependencies
pub fn archive_with_deps(id: &str, version: &str, deps: &[(&str, &str)]) -> Vec<u8> {
    let mut manifest = PackageManifest::new(id, v(version));
    for (dep, constraint) in deps {
        manifest = manifest.with_dependency(*dep, VersionConstraint::parse(constraint).unwrap());
    }
    let payload = format!("lib/{}.dll", id);
    pack(&manifest, &[(payload.as_str(), id.as_bytes())]).unwrap()
}

/// Write a packages.config declaring `(id, version)` pairs
pub fn write_packages_config(path: &Path, packages: &[(&str, &str)]) {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<packages>\n");
    for (id, version) in packages {
        xml.push_str(&format!("  <package id=\"{}\" version=\"{}\" />\n", id, version));
    }
    xml.push_str("</packages>\n");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, xml).unwrap();
}

struct Published {
    version: PackageVersion,
    listed: bool,
    bytes: Vec<u8>,
}

/// In-memory feed that counts its calls
pub struct FakeFeed {
    name: String,
    packages: Mutex<HashMap<String, Vec<Published>>>,
    fetches: AtomicUsize,
    listings: AtomicUsize,
    broken: bool,
    delay: Option<Duration>,
}

impl FakeFeed {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            packages: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            listings: AtomicUsize::new(0),
            broken: false,
            delay: None,
        }
    }

    /// A feed whose every call fails
    pub fn broken(name: &str) -> Self {
        Self {
            broken: true,
            ..Self::new(name)
        }
    }

    /// Sleep this long inside every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn publish(self, id: &str, version: &str) -> Self {
        let bytes = archive(id, version);
        self.publish_bytes(id, version, true, bytes)
    }

    pub fn publish_unlisted(self, id: &str, version: &str) -> Self {
        let bytes = archive(id, version);
        self.publish_bytes(id, version, false, bytes)
    }

    pub fn publish_with_deps(self, id: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        let bytes = archive_with_deps(id, version, deps);
        self.publish_bytes(id, version, true, bytes)
    }

    pub fn publish_bytes(self, id: &str, version: &str, listed: bool, bytes: Vec<u8>) -> Self {
        self.packages
            .lock()
            .unwrap()
            .entry(id.to_ascii_lowercase())
            .or_default()
            .push(Published {
                version: v(version),
                listed,
                bytes,
            });
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageFeed for FakeFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_versions(&self, id: &str) -> Result<Vec<FeedVersion>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(Error::Feed {
                feed: self.name.clone(),
                message: "connection refused".to_string(),
            });
        }
        let packages = self.packages.lock().unwrap();
        Ok(packages
            .get(&id.to_ascii_lowercase())
            .map(|published| {
                published
                    .iter()
                    .map(|p| FeedVersion {
                        version: p.version.clone(),
                        listed: p.listed,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch(&self, id: &str, version: &PackageVersion) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken {
            return Err(Error::Feed {
                feed: self.name.clone(),
                message: "connection refused".to_string(),
            });
        }
        let packages = self.packages.lock().unwrap();
        packages
            .get(&id.to_ascii_lowercase())
            .and_then(|published| published.iter().find(|p| &p.version == version))
            .map(|p| p.bytes.clone())
            .ok_or_else(|| Error::NotFound(format!("{} {}", id, version)))
    }
}
