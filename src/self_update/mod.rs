// src/self_update/mod.rs

//! Self-update
//!
//! Checks the primary feed for a newer build of the tool's own package and
//! swaps the running executable for it:
//!
//! ```text
//! check version -> up to date
//!               -> download -> rename running exe to <exe>.old -> write new exe
//! ```
//!
//! The new package is fetched completely into memory before the executable
//! is touched. If writing the new executable fails, the backup is renamed
//! back; if that also fails the error names the backup for manual recovery.

use crate::error::{Error, Result, UpdateStage};
use crate::filesystem::write_atomic;
use crate::package::PackageArchive;
use crate::progress::{ProgressEvent, ProgressSink, SilentProgress};
use crate::resolver::{select_version, DependencyBehavior, ResolutionPolicy};
use crate::source::{list_tier, PackageFeed};
use crate::version::{PackageVersion, VersionConstraint};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Suffix appended to the executable path for the backup copy
pub const BACKUP_SUFFIX: &str = ".old";

/// Package id the tool publishes itself under
pub const SELF_PACKAGE_ID: &str = "NuPack.CommandLine";

/// Version this binary was built as, if it parses
pub fn running_version() -> Option<PackageVersion> {
    PackageVersion::parse(env!("CARGO_PKG_VERSION")).ok()
}

/// The file operations the replacement step performs
///
/// Tests substitute a recording implementation to observe the exact
/// sequence of renames and writes.
pub trait FileOps: Send + Sync {
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;
}

/// Real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        write_atomic(path, content).map_err(|e| match e {
            Error::Io(e) => e,
            other => io::Error::other(other.to_string()),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }
}

/// How a self-update ended
#[derive(Debug)]
pub enum UpdateOutcome {
    UpToDate {
        version: PackageVersion,
    },
    Updated {
        from: Option<PackageVersion>,
        to: PackageVersion,
    },
    Failed(Error),
}

impl UpdateOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UpdateOutcome::Failed(Error::Cancelled))
    }
}

/// Replaces the running executable with the newest published build
pub struct SelfUpdater {
    feed: Arc<dyn PackageFeed>,
    package_id: String,
    exe_name: String,
    exe_path: PathBuf,
    file_ops: Arc<dyn FileOps>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl SelfUpdater {
    /// `exe_path` is the file to replace; the package must contain a file
    /// with the same name
    pub fn new(feed: Arc<dyn PackageFeed>, exe_path: impl Into<PathBuf>) -> Self {
        let exe_path = exe_path.into();
        let exe_name = exe_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            feed,
            package_id: SELF_PACKAGE_ID.to_string(),
            exe_name,
            exe_path,
            file_ops: Arc::new(StdFileOps),
            progress: Arc::new(SilentProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_file_ops(mut self, file_ops: Arc<dyn FileOps>) -> Self {
        self.file_ops = file_ops;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut path = self.exe_path.clone().into_os_string();
        path.push(BACKUP_SUFFIX);
        PathBuf::from(path)
    }

    /// Update from `running` (None when the build version is unknown)
    pub async fn update(&self, running: Option<PackageVersion>) -> UpdateOutcome {
        match self.try_update(running).await {
            Ok(outcome) => outcome,
            Err(e) => UpdateOutcome::Failed(e),
        }
    }

    async fn try_update(&self, running: Option<PackageVersion>) -> Result<UpdateOutcome> {
        let latest = self.latest_version().await?;

        match &running {
            Some(current) if *current >= latest => {
                info!("{} {} is up to date", self.package_id, current);
                self.progress.emit(ProgressEvent::Message(format!(
                    "{} is up to date ({})",
                    self.package_id, current
                )));
                return Ok(UpdateOutcome::UpToDate {
                    version: current.clone(),
                });
            }
            Some(current) => info!("Updating {} from {} to {}", self.package_id, current, latest),
            None => info!("Running version unknown; updating {} to {}", self.package_id, latest),
        }

        let content = self.download(&latest).await?;
        self.replace(&content)?;

        self.progress.emit(ProgressEvent::Installed {
            package: format!("{} {}", self.package_id, latest),
        });
        Ok(UpdateOutcome::Updated {
            from: running,
            to: latest,
        })
    }

    async fn latest_version(&self) -> Result<PackageVersion> {
        self.progress.emit(ProgressEvent::Resolving {
            package: self.package_id.clone(),
        });

        let feeds = [Arc::clone(&self.feed)];
        let listing = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            listing = list_tier(&feeds, &self.package_id) => listing,
        };

        // Default prerelease and unlisted rules, newest version
        let policy = ResolutionPolicy::new(DependencyBehavior::Highest);
        select_version(&listing.candidates, &VersionConstraint::Any, &policy).ok_or_else(|| {
            let mut message = format!(
                "no release of {} found on {}",
                self.package_id,
                self.feed.name()
            );
            if !listing.errors.is_empty() {
                message.push_str(&format!(" ({})", listing.errors.join("; ")));
            }
            Error::SelfUpdate {
                stage: UpdateStage::Check,
                message,
            }
        })
    }

    /// Fetch the package and pull the executable out of it, all in memory
    async fn download(&self, version: &PackageVersion) -> Result<Vec<u8>> {
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            fetched = self.feed.fetch(&self.package_id, version) => fetched,
        };
        let download_error = |message: String| Error::SelfUpdate {
            stage: UpdateStage::Download,
            message,
        };

        let bytes = fetched.map_err(|e| download_error(e.to_string()))?;
        self.progress.emit(ProgressEvent::Downloaded {
            package: format!("{} {}", self.package_id, version),
            feed: self.feed.name().to_string(),
        });

        let archive = PackageArchive::from_bytes(&bytes).map_err(|e| download_error(e.to_string()))?;
        let entry = archive.find_file(&self.exe_name).ok_or_else(|| {
            download_error(format!(
                "package {} {} does not contain {}",
                self.package_id, version, self.exe_name
            ))
        })?;
        if entry.data.is_empty() {
            return Err(download_error(format!("{} in the package is empty", self.exe_name)));
        }
        Ok(entry.data.clone())
    }

    fn replace(&self, content: &[u8]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let backup = self.backup_path();

        match self.file_ops.remove_file(&backup) {
            Ok(()) => debug!("Removed stale backup {}", backup.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::SelfUpdate {
                    stage: UpdateStage::Backup,
                    message: format!("cannot remove {}: {}", backup.display(), e),
                });
            }
        }

        self.file_ops
            .rename(&self.exe_path, &backup)
            .map_err(|e| Error::SelfUpdate {
                stage: UpdateStage::Backup,
                message: format!(
                    "cannot move {} to {}: {}",
                    self.exe_path.display(),
                    backup.display(),
                    e
                ),
            })?;

        // Interrupted here the executable is only at the backup path
        if self.cancel.is_cancelled() {
            warn!(
                "Self-update cancelled; the previous executable is at {}",
                backup.display()
            );
            return Err(Error::Cancelled);
        }

        let Err(write_error) = self.file_ops.write(&self.exe_path, content) else {
            return Ok(());
        };

        let message = match self.file_ops.rename(&backup, &self.exe_path) {
            Ok(()) => format!(
                "cannot write {}: {}; the previous executable was restored",
                self.exe_path.display(),
                write_error
            ),
            Err(rollback_error) => format!(
                "cannot write {}: {}; restoring the backup also failed ({}), \
                 rename {} to {} manually",
                self.exe_path.display(),
                write_error,
                rollback_error,
                backup.display(),
                self.exe_path.display()
            ),
        };
        Err(Error::SelfUpdate {
            stage: UpdateStage::Write,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{pack, PackageManifest};
    use crate::source::LocalFeed;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Remove,
        Rename,
        Write,
    }

    /// Real filesystem underneath, with every call recorded
    #[derive(Default)]
    struct RecordingOps {
        ops: Mutex<Vec<Op>>,
        fail_writes: bool,
        cancel_on_rename: Option<CancellationToken>,
    }

    impl RecordingOps {
        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl FileOps for RecordingOps {
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.ops.lock().unwrap().push(Op::Remove);
            StdFileOps.remove_file(path)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.ops.lock().unwrap().push(Op::Rename);
            StdFileOps.rename(from, to)?;
            if let Some(token) = &self.cancel_on_rename {
                token.cancel();
            }
            Ok(())
        }

        fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
            self.ops.lock().unwrap().push(Op::Write);
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            StdFileOps.write(path, content)
        }
    }

    struct Fixture {
        _temp: TempDir,
        feed: Arc<dyn PackageFeed>,
        exe: PathBuf,
    }

    fn fixture(published: &str) -> Fixture {
        let temp = TempDir::new().unwrap();
        let feed_dir = temp.path().join("feed");
        std::fs::create_dir_all(&feed_dir).unwrap();

        let version = PackageVersion::parse(published).unwrap();
        let manifest = PackageManifest::new(SELF_PACKAGE_ID, version.clone());
        let bytes = pack(&manifest, &[("tools/nupack", "new build".as_bytes())]).unwrap();
        std::fs::write(
            feed_dir.join(format!("{}.{}.nupkg", SELF_PACKAGE_ID, version)),
            bytes,
        )
        .unwrap();

        let bin = temp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join("nupack");
        std::fs::write(&exe, "old build").unwrap();

        Fixture {
            feed: Arc::new(LocalFeed::new("local", feed_dir)),
            exe,
            _temp: temp,
        }
    }

    fn v(s: &str) -> Option<PackageVersion> {
        Some(PackageVersion::parse(s).unwrap())
    }

    #[tokio::test]
    async fn test_up_to_date_touches_nothing() {
        let fx = fixture("1.0.0");
        let ops = Arc::new(RecordingOps::default());
        let updater = SelfUpdater::new(fx.feed.clone(), &fx.exe).with_file_ops(ops.clone());

        let outcome = updater.update(v("1.0.0")).await;
        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
        assert!(ops.ops().is_empty());
        assert_eq!(std::fs::read_to_string(&fx.exe).unwrap(), "old build");
    }

    #[tokio::test]
    async fn test_update_renames_then_writes() {
        let fx = fixture("1.1.0");
        let ops = Arc::new(RecordingOps::default());
        let updater = SelfUpdater::new(fx.feed.clone(), &fx.exe).with_file_ops(ops.clone());

        let outcome = updater.update(v("1.0.0")).await;
        match outcome {
            UpdateOutcome::Updated { from, to } => {
                assert_eq!(from, v("1.0.0"));
                assert_eq!(to.to_string(), "1.1.0");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(ops.ops(), vec![Op::Remove, Op::Rename, Op::Write]);
        assert_eq!(std::fs::read_to_string(&fx.exe).unwrap(), "new build");
        assert_eq!(
            std::fs::read_to_string(updater.backup_path()).unwrap(),
            "old build"
        );
    }

    #[tokio::test]
    async fn test_unknown_running_version_updates() {
        let fx = fixture("0.1.0");
        let updater = SelfUpdater::new(fx.feed.clone(), &fx.exe);

        let outcome = updater.update(None).await;
        assert!(matches!(outcome, UpdateOutcome::Updated { from: None, .. }));
        assert_eq!(std::fs::read_to_string(&fx.exe).unwrap(), "new build");
    }

    #[tokio::test]
    async fn test_stale_backup_is_replaced() {
        let fx = fixture("2.0.0");
        let updater = SelfUpdater::new(fx.feed.clone(), &fx.exe);
        std::fs::write(updater.backup_path(), "ancient build").unwrap();

        assert!(matches!(
            updater.update(v("1.0.0")).await,
            UpdateOutcome::Updated { .. }
        ));
        assert_eq!(
            std::fs::read_to_string(updater.backup_path()).unwrap(),
            "old build"
        );
    }

    #[tokio::test]
    async fn test_cancel_between_rename_and_write() {
        let fx = fixture("1.1.0");
        let token = CancellationToken::new();
        let ops = Arc::new(RecordingOps {
            cancel_on_rename: Some(token.clone()),
            ..Default::default()
        });
        let updater = SelfUpdater::new(fx.feed.clone(), &fx.exe)
            .with_file_ops(ops.clone())
            .with_cancellation(token);

        let outcome = updater.update(v("1.0.0")).await;
        assert!(outcome.is_cancelled());
        assert!(!fx.exe.exists());
        assert!(updater.backup_path().exists());
        assert!(!ops.ops().contains(&Op::Write));
    }

    #[tokio::test]
    async fn test_write_failure_rolls_back() {
        let fx = fixture("1.1.0");
        let ops = Arc::new(RecordingOps {
            fail_writes: true,
            ..Default::default()
        });
        let updater = SelfUpdater::new(fx.feed.clone(), &fx.exe).with_file_ops(ops.clone());

        match updater.update(v("1.0.0")).await {
            UpdateOutcome::Failed(Error::SelfUpdate { stage, .. }) => {
                assert_eq!(stage, UpdateStage::Write);
                assert!(stage.backup_may_exist());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            ops.ops(),
            vec![Op::Remove, Op::Rename, Op::Write, Op::Rename]
        );
        assert_eq!(std::fs::read_to_string(&fx.exe).unwrap(), "old build");
        assert!(!updater.backup_path().exists());
    }

    #[tokio::test]
    async fn test_missing_executable_in_package() {
        let fx = fixture("1.1.0");
        let ops = Arc::new(RecordingOps::default());
        let updater = SelfUpdater::new(fx.feed.clone(), fx.exe.with_file_name("other"))
            .with_file_ops(ops.clone());

        match updater.update(v("1.0.0")).await {
            UpdateOutcome::Failed(Error::SelfUpdate { stage, .. }) => {
                assert_eq!(stage, UpdateStage::Download);
                assert!(!stage.backup_may_exist());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(ops.ops().is_empty());
    }

    #[tokio::test]
    async fn test_no_release_published() {
        let temp = TempDir::new().unwrap();
        let feed: Arc<dyn PackageFeed> = Arc::new(LocalFeed::new("empty", temp.path()));
        let updater = SelfUpdater::new(feed, temp.path().join("nupack"));

        assert!(matches!(
            updater.update(v("1.0.0")).await,
            UpdateOutcome::Failed(Error::SelfUpdate {
                stage: UpdateStage::Check,
                ..
            })
        ));
    }
}
