// src/acquire/orchestrator.rs

//! Acquisition orchestrator
//!
//! Turns references into installed packages:
//!
//! 1. resolve a concrete version (pinned versions skip the feeds entirely;
//!    otherwise primary feeds first, secondary only if the primary tier
//!    offers nothing usable)
//! 2. fetch the archive from the first feed that serves it
//! 3. extract it into the packages folder
//!
//! Identities are processed concurrently up to `max_concurrent`, each one at
//! most once per run. The first identity that no feed can satisfy stops the
//! run; packages already installed stay installed.

use super::coalesce::Coalescer;
use super::extract::{PackageExtractor, SaveMode};
use super::result::RunResult;
use crate::config::DEFAULT_MAX_CONCURRENT;
use crate::error::{AcquisitionFailure, Error};
use crate::package::{fold_name, ManifestDependency, PackageIdentity, PackageReference};
use crate::progress::{ProgressEvent, ProgressSink, SilentProgress};
use crate::reference::{
    load_scopes, DirectoryPresence, InstallPresence, InstalledReferenceMap, MissingSet,
    ReferenceReader, Scope, ScopeMode,
};
use crate::resolver::{PolicyResolver, ResolutionPolicy, VersionResolver};
use crate::source::{list_tier, SourceTierSet};
use crate::version::{PackageVersion, VersionConstraint};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to one identity
#[derive(Debug, Clone)]
enum Outcome {
    Installed {
        identity: PackageIdentity,
        dependencies: Vec<ManifestDependency>,
    },
    Present,
    Failed(AcquisitionFailure),
    Cancelled,
}

/// State shared by every acquisition in one run
struct RunContext {
    coalescer: Coalescer<Outcome>,
    /// Cancelled by the caller, or by the first failed identity
    abort: CancellationToken,
    warnings: Mutex<Vec<String>>,
}

impl RunContext {
    fn warn(&self, message: String) {
        warn!("{}", message);
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message);
        }
    }
}

/// Drives restore and install runs against a set of feeds
pub struct Acquirer {
    sources: SourceTierSet,
    install_dir: PathBuf,
    save_mode: SaveMode,
    max_concurrent: usize,
    resolver: Arc<dyn VersionResolver>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl Acquirer {
    pub fn new(sources: SourceTierSet, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            install_dir: install_dir.into(),
            save_mode: SaveMode::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            resolver: Arc::new(PolicyResolver),
            progress: Arc::new(SilentProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_save_mode(mut self, save_mode: SaveMode) -> Self {
        self.save_mode = save_mode;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn VersionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Token whose cancellation abandons in-flight work
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Restore every package the scopes declare that is not installed yet
    pub async fn restore(
        &self,
        scopes: &[Scope],
        reader: &dyn ReferenceReader,
        mode: ScopeMode,
    ) -> RunResult {
        let load = match load_scopes(scopes, reader, mode) {
            Ok(load) => load,
            Err(e) => return RunResult::failed(e),
        };
        for warning in &load.warnings {
            self.progress.emit(ProgressEvent::Warning(warning.clone()));
        }

        let mut result = self.restore_declared(&load.map).await;
        let mut warnings = load.warnings;
        warnings.append(&mut result.warnings);
        result.warnings = warnings;
        result
    }

    /// Restore the missing entries of an already aggregated map
    ///
    /// Only the declared identities are acquired; their dependencies are not.
    pub async fn restore_declared(&self, map: &InstalledReferenceMap) -> RunResult {
        let presence = DirectoryPresence::new(&self.install_dir);
        let missing = MissingSet::compute(map, &presence);

        if missing.is_empty() {
            self.progress.emit(ProgressEvent::Message(
                "All packages listed are already installed.".to_string(),
            ));
            return RunResult::default();
        }

        for (reference, scopes) in missing.iter() {
            debug!("{} is missing (declared by {})", reference, scopes.join(", "));
        }
        info!(
            "Restoring {} of {} package(s) into {}",
            missing.len(),
            map.len(),
            self.install_dir.display()
        );

        let references = missing.references().cloned().collect();
        let mut result = self.run(references, &ResolutionPolicy::restore()).await;
        result.restore_notice = result.installed_count > 0;
        result
    }

    /// Install one package, and its dependencies unless the policy says `Ignore`
    pub async fn install(
        &self,
        id: &str,
        version: Option<PackageVersion>,
        policy: &ResolutionPolicy,
    ) -> RunResult {
        let reference = match version {
            Some(version) => PackageReference::exact(id, version),
            None => PackageReference::latest(id),
        };
        self.run(vec![reference], policy).await
    }

    async fn run(&self, roots: Vec<PackageReference>, policy: &ResolutionPolicy) -> RunResult {
        let ctx = RunContext {
            coalescer: Coalescer::new(),
            abort: self.cancel.child_token(),
            warnings: Mutex::new(Vec::new()),
        };
        let presence = DirectoryPresence::new(&self.install_dir);

        let mut result = RunResult::default();
        let mut failures = Vec::new();
        let mut visited: HashSet<String> = roots.iter().map(|r| r.identity.lower_name()).collect();
        // Dependencies cut by the visited set, rechecked once the run settles
        let mut revisited: Vec<(String, ManifestDependency)> = Vec::new();
        let mut frontier = roots;

        while !frontier.is_empty() {
            self.progress.emit(ProgressEvent::Planned(frontier.len()));
            let outcomes = self.acquire_all(&ctx, frontier, policy).await;

            let mut next = Vec::new();
            for outcome in outcomes {
                match outcome {
                    Outcome::Installed {
                        identity,
                        dependencies,
                    } => {
                        let dependent = identity.to_string();
                        result.record_installed(identity);
                        if !policy.dependency_behavior.expands_dependencies() {
                            continue;
                        }
                        for dependency in dependencies {
                            if !visited.insert(fold_name(&dependency.id)) {
                                revisited.push((dependent.clone(), dependency));
                                continue;
                            }
                            let satisfied = presence
                                .installed_versions(&dependency.id)
                                .iter()
                                .any(|v| dependency.constraint.satisfies(v));
                            if satisfied {
                                debug!("Dependency {} is already satisfied", dependency.id);
                                continue;
                            }
                            next.push(
                                PackageReference::latest(dependency.id)
                                    .with_allowed_versions(dependency.constraint),
                            );
                        }
                    }
                    Outcome::Failed(failure) => failures.push(failure),
                    Outcome::Present | Outcome::Cancelled => {}
                }
            }

            if !failures.is_empty() || ctx.abort.is_cancelled() {
                break;
            }
            frontier = next;
        }

        if failures.is_empty() && !ctx.abort.is_cancelled() {
            for (dependent, dependency) in revisited {
                let satisfied = presence
                    .installed_versions(&dependency.id)
                    .iter()
                    .any(|v| dependency.constraint.satisfies(v));
                if !satisfied {
                    ctx.warn(format!(
                        "{} requires {} ({}), but the version selected in this run does not satisfy it",
                        dependent, dependency.id, dependency.constraint
                    ));
                }
            }
        }

        debug!(
            "{} acquisition(s) shared an in-flight or finished result",
            ctx.coalescer.coalesced_count()
        );
        result.warnings = ctx
            .warnings
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.cancel.is_cancelled() {
            result.fatal_error = Some(Error::Cancelled);
        } else if !failures.is_empty() {
            result.fatal_error = Some(Error::Acquisition { failures });
        }
        result
    }

    async fn acquire_all(
        &self,
        ctx: &RunContext,
        references: Vec<PackageReference>,
        policy: &ResolutionPolicy,
    ) -> Vec<Outcome> {
        stream::iter(references)
            .map(|reference| async move {
                let outcome = self.acquire(ctx, &reference, policy).await;
                if let Outcome::Failed(ref failure) = outcome {
                    self.progress.emit(ProgressEvent::Failed {
                        package: failure.package.clone(),
                        reason: failure.reason.clone(),
                    });
                    ctx.abort.cancel();
                }
                outcome
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }

    async fn acquire(
        &self,
        ctx: &RunContext,
        reference: &PackageReference,
        policy: &ResolutionPolicy,
    ) -> Outcome {
        if ctx.abort.is_cancelled() {
            return Outcome::Cancelled;
        }

        let name = reference.identity.name();
        let constraint = reference.constraint();
        let version = match constraint.pinned() {
            Some(version) => version.clone(),
            None => match self.resolve_version(ctx, name, &constraint, policy).await {
                Ok(version) => version,
                Err(outcome) => return outcome,
            },
        };

        let identity = PackageIdentity::concrete(name, version);
        let key = identity.key();
        ctx.coalescer
            .run(&key, || self.fetch_and_extract(ctx, identity.clone()))
            .await
    }

    async fn resolve_version(
        &self,
        ctx: &RunContext,
        name: &str,
        constraint: &VersionConstraint,
        policy: &ResolutionPolicy,
    ) -> std::result::Result<PackageVersion, Outcome> {
        self.progress.emit(ProgressEvent::Resolving {
            package: name.to_string(),
        });

        let mut feed_errors = Vec::new();
        for tier in self.sources.tiers() {
            if tier.is_empty() {
                continue;
            }
            let listing = tokio::select! {
                _ = ctx.abort.cancelled() => return Err(Outcome::Cancelled),
                listing = list_tier(tier, name) => listing,
            };
            feed_errors.extend(listing.errors);

            if let Some(version) = self
                .resolver
                .select(name, &listing.candidates, constraint, policy)
            {
                for error in feed_errors {
                    ctx.warn(format!("Feed error while resolving {}: {}", name, error));
                }
                debug!("Resolved {} ({}) to {}", name, constraint, version);
                return Ok(version);
            }
        }

        let mut reason = if self.sources.is_empty() {
            "no package sources are configured".to_string()
        } else {
            format!("no version matching '{}' was found on any feed", constraint)
        };
        if !feed_errors.is_empty() {
            reason.push_str(&format!(" ({})", feed_errors.join("; ")));
        }
        Err(Outcome::Failed(AcquisitionFailure {
            package: name.to_string(),
            reason,
        }))
    }

    async fn fetch_and_extract(&self, ctx: &RunContext, identity: PackageIdentity) -> Outcome {
        let presence = DirectoryPresence::new(&self.install_dir);
        if presence.is_present(&identity) {
            self.progress.emit(ProgressEvent::AlreadyInstalled {
                package: identity.to_string(),
            });
            return Outcome::Present;
        }

        let Some(version) = identity.version() else {
            return failed(&identity, "no version selected".to_string());
        };
        let fetched = tokio::select! {
            _ = ctx.abort.cancelled() => return Outcome::Cancelled,
            fetched = self.sources.fetch(identity.name(), version) => fetched,
        };
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => return failed(&identity, e.to_string()),
        };
        self.progress.emit(ProgressEvent::Downloaded {
            package: identity.to_string(),
            feed: fetched.feed.clone(),
        });

        if ctx.abort.is_cancelled() {
            return Outcome::Cancelled;
        }

        let extractor = PackageExtractor::new(&self.install_dir, self.save_mode);
        let target = identity.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extractor.extract(&target, &fetched.bytes)).await;

        match extracted {
            Ok(Ok(extracted)) if extracted.already_present => {
                self.progress.emit(ProgressEvent::AlreadyInstalled {
                    package: identity.to_string(),
                });
                Outcome::Present
            }
            Ok(Ok(extracted)) => {
                self.progress.emit(ProgressEvent::Installed {
                    package: identity.to_string(),
                });
                Outcome::Installed {
                    identity,
                    dependencies: extracted.manifest.dependencies,
                }
            }
            Ok(Err(e)) => failed(&identity, e.to_string()),
            Err(e) => failed(&identity, format!("extraction task failed: {}", e)),
        }
    }
}

fn failed(identity: &PackageIdentity, reason: String) -> Outcome {
    Outcome::Failed(AcquisitionFailure {
        package: identity.to_string(),
        reason,
    })
}
