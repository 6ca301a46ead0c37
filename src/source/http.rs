// src/source/http.rs

//! HTTP flat-container feed
//!
//! Layout, with `{id}` and `{version}` lowercased:
//! - `GET {base}/{id}/index.json` → `{"versions": [...], "unlisted": [...]}`
//! - `GET {base}/{id}/{version}/{id}.{version}.nupkg` → archive bytes
//!
//! A 404 on the index means the feed has no versions of the package; a 404 on
//! the archive is `Error::NotFound`. Transport errors and other non-success
//! statuses are retried with linear backoff.

use super::feed::{FeedVersion, PackageFeed};
use crate::error::{Error, Result};
use crate::package::fold_name;
use crate::version::PackageVersion;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts per request
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// Body of `{id}/index.json`
#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    unlisted: Vec<String>,
}

/// Package feed served over HTTP(S)
pub struct HttpFeed {
    name: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFeed {
    /// Create a feed for `base_url`
    pub fn new(name: impl Into<String>, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::InvalidOption(format!("invalid feed URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidOption(format!(
                "feed URL '{}' must use http or https",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("nupack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Override retry behavior
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    fn index_url(&self, id: &str) -> String {
        format!("{}/{}/index.json", self.base_url, fold_name(id))
    }

    fn archive_url(&self, id: &str, version: &PackageVersion) -> String {
        let id = fold_name(id);
        let version = version.to_string().to_ascii_lowercase();
        format!("{}/{}/{}/{}.{}.nupkg", self.base_url, id, version, id, version)
    }

    /// GET with retries; `Ok(None)` on 404
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_get(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::feed(
                            &self.name,
                            format!("{} failed after {} attempts: {}", url, attempt, e),
                        ));
                    }
                    warn!("Request to {} failed (attempt {}): {}, retrying...", url, attempt, e);
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
            }
        }
    }

    async fn try_get(&self, url: &str) -> std::result::Result<Option<Vec<u8>>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(Some(body.to_vec()))
    }
}

#[async_trait]
impl PackageFeed for HttpFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_versions(&self, id: &str) -> Result<Vec<FeedVersion>> {
        let url = self.index_url(id);
        debug!("Fetching version index {}", url);

        let Some(body) = self.get(&url).await? else {
            return Ok(Vec::new());
        };
        let index: VersionIndex = serde_json::from_slice(&body)
            .map_err(|e| Error::feed(&self.name, format!("malformed index {}: {}", url, e)))?;

        let unlisted: Vec<PackageVersion> = index
            .unlisted
            .iter()
            .filter_map(|v| PackageVersion::parse(v).ok())
            .collect();

        let mut versions = Vec::with_capacity(index.versions.len());
        for text in &index.versions {
            match PackageVersion::parse(text) {
                Ok(version) => {
                    let listed = !unlisted.contains(&version);
                    versions.push(FeedVersion { version, listed });
                }
                Err(e) => debug!("Skipping version '{}' of {} on {}: {}", text, id, self.name, e),
            }
        }
        Ok(versions)
    }

    async fn fetch(&self, id: &str, version: &PackageVersion) -> Result<Vec<u8>> {
        let url = self.archive_url(id, version);
        debug!("Downloading {}", url);

        self.get(&url)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {} on '{}'", id, version, self.name)))
    }
}
