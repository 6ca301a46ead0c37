// src/source/mod.rs

//! Package sources
//!
//! - [`PackageFeed`]: the per-feed client interface
//! - [`LocalFeed`] / [`HttpFeed`]: directory and HTTP implementations
//! - [`SourceTierSet`]: configured feeds split into primary and fallback tiers

mod feed;
mod http;
mod local;
mod tiers;

pub use feed::{FeedVersion, PackageFeed};
pub use http::HttpFeed;
pub use local::LocalFeed;
pub use tiers::{list_tier, FetchedPackage, SourceTierSet, TierListing};
