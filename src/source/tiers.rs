// src/source/tiers.rs

//! Primary and secondary feed tiers
//!
//! Primary feeds are always consulted first, for metadata and for content.
//! Secondary feeds are only asked when the primary tier cannot help.

use super::feed::{FeedVersion, PackageFeed};
use super::http::HttpFeed;
use super::local::LocalFeed;
use crate::config::{is_remote_location, Settings, SourceConfig, SourceTier};
use crate::error::{Error, Result};
use crate::filesystem::path::absolutize;
use crate::version::PackageVersion;
use futures::future::join_all;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Versions gathered from every feed of one tier
#[derive(Debug, Default)]
pub struct TierListing {
    /// Union of all feeds' versions; a version listed anywhere counts as listed
    pub candidates: Vec<FeedVersion>,
    /// Per-feed failures, formatted with the feed name
    pub errors: Vec<String>,
}

/// Archive bytes and where they came from
#[derive(Debug)]
pub struct FetchedPackage {
    pub bytes: Vec<u8>,
    pub feed: String,
}

/// Ordered feeds split into a primary and a fallback tier
#[derive(Clone, Default)]
pub struct SourceTierSet {
    primary: Vec<Arc<dyn PackageFeed>>,
    secondary: Vec<Arc<dyn PackageFeed>>,
}

impl fmt::Debug for SourceTierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |feeds: &[Arc<dyn PackageFeed>]| {
            feeds.iter().map(|f| f.name().to_string()).collect::<Vec<_>>()
        };
        f.debug_struct("SourceTierSet")
            .field("primary", &names(&self.primary))
            .field("secondary", &names(&self.secondary))
            .finish()
    }
}

impl SourceTierSet {
    pub fn new(primary: Vec<Arc<dyn PackageFeed>>, secondary: Vec<Arc<dyn PackageFeed>>) -> Self {
        Self { primary, secondary }
    }

    /// Build feeds from configured sources
    ///
    /// When `explicit` sources are given (relative paths resolved against
    /// `cwd`), they become the primary tier and every configured source is
    /// demoted to the secondary tier.
    pub fn from_settings(settings: &Settings, explicit: &[String], cwd: &Path) -> Result<Self> {
        let mut primary = Vec::new();
        let mut secondary = Vec::new();

        for location in explicit {
            let location = if is_remote_location(location) {
                location.clone()
            } else {
                absolutize(cwd, location).to_string_lossy().into_owned()
            };
            let source = SourceConfig::new(location.clone(), location, SourceTier::Primary);
            primary.push(feed_for(&source)?);
        }

        for source in &settings.sources {
            let feed = feed_for(source)?;
            if explicit.is_empty() && source.tier == SourceTier::Primary {
                primary.push(feed);
            } else {
                secondary.push(feed);
            }
        }

        let tiers = Self { primary, secondary };
        debug!("Configured feeds: {:?}", tiers);
        Ok(tiers)
    }

    pub fn primary(&self) -> &[Arc<dyn PackageFeed>] {
        &self.primary
    }

    pub fn secondary(&self) -> &[Arc<dyn PackageFeed>] {
        &self.secondary
    }

    /// Tiers in consultation order
    pub fn tiers(&self) -> [&[Arc<dyn PackageFeed>]; 2] {
        [&self.primary, &self.secondary]
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }

    /// The first primary feed, used by self-update
    pub fn primary_feed(&self) -> Option<Arc<dyn PackageFeed>> {
        self.primary.first().cloned()
    }

    /// Fetch from the first feed, primary tier first, that serves `id` at `version`
    ///
    /// Returns `Error::NotFound` when every feed answered "not found", and a
    /// feed error naming every failure otherwise.
    pub async fn fetch(&self, id: &str, version: &PackageVersion) -> Result<FetchedPackage> {
        let mut errors = Vec::new();
        let mut all_not_found = true;

        for feed in self.primary.iter().chain(self.secondary.iter()) {
            match feed.fetch(id, version).await {
                Ok(bytes) => {
                    return Ok(FetchedPackage {
                        bytes,
                        feed: feed.name().to_string(),
                    });
                }
                Err(e) => {
                    debug!("Feed '{}' could not serve {} {}: {}", feed.name(), id, version, e);
                    all_not_found &= e.is_not_found();
                    errors.push(format!("{}: {}", feed.name(), e));
                }
            }
        }

        if errors.is_empty() {
            return Err(Error::NotFound(format!("{} {}: no feeds configured", id, version)));
        }
        if all_not_found {
            return Err(Error::NotFound(format!(
                "{} {} on any feed ({})",
                id,
                version,
                errors.join("; ")
            )));
        }
        Err(Error::Feed {
            feed: "all feeds".to_string(),
            message: errors.join("; "),
        })
    }
}

/// Query every feed of one tier concurrently and merge the results
pub async fn list_tier(feeds: &[Arc<dyn PackageFeed>], id: &str) -> TierListing {
    let results = join_all(feeds.iter().map(|feed| async move {
        (feed.name().to_string(), feed.list_versions(id).await)
    }))
    .await;

    let mut listing = TierListing::default();
    for (name, result) in results {
        match result {
            Ok(versions) => {
                for candidate in versions {
                    match listing
                        .candidates
                        .iter_mut()
                        .find(|c| c.version == candidate.version)
                    {
                        Some(existing) => existing.listed |= candidate.listed,
                        None => listing.candidates.push(candidate),
                    }
                }
            }
            Err(e) => listing.errors.push(format!("{}: {}", name, e)),
        }
    }
    listing
}

fn feed_for(source: &SourceConfig) -> Result<Arc<dyn PackageFeed>> {
    if source.is_remote() {
        Ok(Arc::new(HttpFeed::new(source.name.clone(), &source.location)?))
    } else {
        Ok(Arc::new(LocalFeed::new(source.name.clone(), &source.location)))
    }
}
