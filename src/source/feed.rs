// src/source/feed.rs

//! Feed trait shared by local and remote package sources

use crate::error::Result;
use crate::version::PackageVersion;
use async_trait::async_trait;

/// One version a feed advertises for a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedVersion {
    pub version: PackageVersion,
    /// Unlisted versions can still be fetched when pinned
    pub listed: bool,
}

impl FeedVersion {
    pub fn listed(version: PackageVersion) -> Self {
        Self {
            version,
            listed: true,
        }
    }

    pub fn unlisted(version: PackageVersion) -> Self {
        Self {
            version,
            listed: false,
        }
    }
}

/// A provider of package metadata and archives
///
/// Both operations fail independently: a feed that cannot list versions may
/// still serve an archive for a pinned version, and vice versa.
#[async_trait]
pub trait PackageFeed: Send + Sync {
    /// Human-readable name for logs and error messages
    fn name(&self) -> &str;

    /// All versions this feed has for `id`
    ///
    /// A feed that has never heard of the package returns an empty list, not
    /// an error.
    async fn list_versions(&self, id: &str) -> Result<Vec<FeedVersion>>;

    /// Archive bytes for `id` at `version`
    ///
    /// Returns `Error::NotFound` when this feed does not carry that version.
    async fn fetch(&self, id: &str, version: &PackageVersion) -> Result<Vec<u8>>;
}
