// src/acquire/extract.rs

//! Materializing a downloaded package into the packages folder
//!
//! Everything is written into a hidden staging directory next to the final
//! one and renamed into place only once complete, so an interrupted
//! extraction never leaves a `<Id>.<Version>` directory behind.

use crate::error::{Error, Result};
use crate::package::{PackageArchive, PackageIdentity, PackageManifest};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which artifacts are kept per installed package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveMode {
    /// `<Id>.nuspec` manifest
    pub nuspec: bool,
    /// `<Id>.<Version>.nupkg` raw archive
    pub nupkg: bool,
    /// Extracted payload files
    pub files: bool,
}

impl SaveMode {
    /// Parse `nuspec;nupkg;files` (any subset, `;` or `,` separated, any case)
    pub fn parse(s: &str) -> Result<Self> {
        let mut mode = SaveMode {
            nuspec: false,
            nupkg: false,
            files: false,
        };

        for part in s.split([';', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "nuspec" => mode.nuspec = true,
                "nupkg" => mode.nupkg = true,
                "files" => mode.files = true,
                other => {
                    return Err(Error::InvalidOption(format!(
                        "unknown save mode '{}' (expected nuspec, nupkg or files)",
                        other
                    )));
                }
            }
        }

        if !(mode.nuspec || mode.nupkg || mode.files) {
            return Err(Error::InvalidOption(format!("save mode '{}' selects nothing", s)));
        }
        Ok(mode)
    }
}

impl Default for SaveMode {
    fn default() -> Self {
        Self {
            nuspec: false,
            nupkg: true,
            files: true,
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            (self.nuspec, "nuspec"),
            (self.nupkg, "nupkg"),
            (self.files, "files"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
        write!(f, "{}", parts.join(";"))
    }
}

/// Result of one extraction
#[derive(Debug, Clone)]
pub struct Extracted {
    pub directory: PathBuf,
    pub manifest: PackageManifest,
    /// Another process installed the same identity first
    pub already_present: bool,
}

/// Writes package archives into `<root>/<Id>.<Version>/`
#[derive(Debug, Clone)]
pub struct PackageExtractor {
    root: PathBuf,
    save_mode: SaveMode,
}

impl PackageExtractor {
    pub fn new(root: impl AsRef<Path>, save_mode: SaveMode) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            save_mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode `bytes` and install them as `identity`
    ///
    /// The archive's manifest must name the same package and version.
    pub fn extract(&self, identity: &PackageIdentity, bytes: &[u8]) -> Result<Extracted> {
        let archive = PackageArchive::from_bytes(bytes)?;
        let manifest = archive.manifest().clone();

        let (Some(dir_name), Some(archive_name)) = (identity.directory_name(), identity.archive_name()) else {
            return Err(Error::InvalidOption(format!(
                "cannot install '{}' without a version",
                identity
            )));
        };
        if !manifest.identity().same_package(identity) || Some(&manifest.version) != identity.version() {
            return Err(Error::Archive(format!(
                "expected {} but the archive contains {} {}",
                identity, manifest.id, manifest.version
            )));
        }

        let target = self.root.join(&dir_name);
        if target.exists() {
            debug!("{} already present at {}", identity, target.display());
            return Ok(Extracted {
                directory: target,
                manifest,
                already_present: true,
            });
        }

        std::fs::create_dir_all(&self.root)?;
        let staging = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempdir_in(&self.root)?;

        if self.save_mode.nupkg {
            std::fs::write(staging.path().join(&archive_name), bytes)?;
        }
        if self.save_mode.nuspec {
            std::fs::write(
                staging.path().join(format!("{}.nuspec", identity.name())),
                archive.manifest_xml(),
            )?;
        }
        if self.save_mode.files {
            for entry in archive.files() {
                let dest = staging.path().join(&entry.path);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&dest, &entry.data)?;
            }
        }

        match std::fs::rename(staging.path(), &target) {
            Ok(()) => {
                info!("Installed {} to {}", identity, target.display());
                Ok(Extracted {
                    directory: target,
                    manifest,
                    already_present: false,
                })
            }
            // Lost a race with another process writing the same identity
            Err(_) if target.exists() => Ok(Extracted {
                directory: target,
                manifest,
                already_present: true,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
