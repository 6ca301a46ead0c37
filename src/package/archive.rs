// src/package/archive.rs

//! Package archive (`.nupkg`) reading and packing
//!
//! Archives are gzip-compressed tarballs with the `.nuspec` manifest at the
//! root and payload files anywhere below it. Archives are small enough to be
//! held in memory; the whole download is read before anything touches disk.

use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_entry_path;
use crate::package::manifest::PackageManifest;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// Maximum size for a single archive entry (512 MB)
pub const MAX_ENTRY_SIZE: u64 = 512 * 1024 * 1024;

/// One payload file inside a package archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Sanitized path relative to the package root
    pub path: PathBuf,
    pub data: Vec<u8>,
}

/// A fully decoded package archive
#[derive(Debug, Clone)]
pub struct PackageArchive {
    manifest: PackageManifest,
    manifest_xml: String,
    files: Vec<ArchiveEntry>,
}

impl PackageArchive {
    /// Decode archive bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        let mut manifest_xml = None;
        let mut files = Vec::new();

        let entries = archive
            .entries()
            .map_err(|e| Error::Archive(format!("Failed to read archive entries: {}", e)))?;

        for entry in entries {
            let mut entry =
                entry.map_err(|e| Error::Archive(format!("Failed to read archive entry: {}", e)))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let raw_path = entry
                .path()
                .map_err(|e| Error::Archive(format!("Invalid entry path: {}", e)))?
                .to_string_lossy()
                .into_owned();
            let path = sanitize_entry_path(&raw_path)?;

            let size = entry.header().size().unwrap_or(0);
            if size > MAX_ENTRY_SIZE {
                return Err(Error::Archive(format!(
                    "entry '{}' is {} bytes, larger than the {} byte limit",
                    raw_path, size, MAX_ENTRY_SIZE
                )));
            }

            let mut data = Vec::with_capacity(size as usize);
            entry
                .read_to_end(&mut data)
                .map_err(|e| Error::Archive(format!("Failed to read '{}': {}", raw_path, e)))?;

            if is_root_manifest(&path) {
                let text = String::from_utf8(data)
                    .map_err(|_| Error::Manifest(format!("'{}' is not UTF-8", raw_path)))?;
                manifest_xml = Some(text);
            } else {
                files.push(ArchiveEntry { path, data });
            }
        }

        let manifest_xml = manifest_xml
            .ok_or_else(|| Error::Archive("archive has no .nuspec manifest".to_string()))?;
        let manifest = PackageManifest::parse(&manifest_xml)?;

        debug!(
            "Decoded archive for {} {} ({} files)",
            manifest.id,
            manifest.version,
            files.len()
        );

        Ok(Self {
            manifest,
            manifest_xml,
            files,
        })
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// Manifest exactly as it appeared in the archive
    pub fn manifest_xml(&self) -> &str {
        &self.manifest_xml
    }

    pub fn files(&self) -> &[ArchiveEntry] {
        &self.files
    }

    /// Find a payload file by its file name (case-insensitive), anywhere in the archive
    pub fn find_file(&self, file_name: &str) -> Option<&ArchiveEntry> {
        self.files.iter().find(|entry| {
            entry
                .path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(file_name))
        })
    }
}

fn is_root_manifest(path: &Path) -> bool {
    path.components().count() == 1
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("nuspec"))
}

/// Pack a manifest and payload files into archive bytes
pub fn pack(manifest: &PackageManifest, files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let manifest_xml = manifest.to_xml();
    append(&mut builder, &manifest.file_name(), manifest_xml.as_bytes())?;
    for (path, data) in files {
        let path = sanitize_entry_path(path)?;
        append(&mut builder, &path.to_string_lossy(), data)?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

fn append<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    builder.append_data(&mut header, path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{PackageVersion, VersionConstraint};

    fn sample_manifest() -> PackageManifest {
        PackageManifest::new("Foo", PackageVersion::parse("1.2.0").unwrap())
            .with_dependency("Bar", VersionConstraint::parse("1.0").unwrap())
    }

    #[test]
    fn test_pack_and_read() {
        let bytes = pack(
            &sample_manifest(),
            &[
                ("lib/Foo.dll", "dll".as_bytes()),
                ("content/readme.txt", "hello".as_bytes()),
            ],
        )
        .unwrap();

        let archive = PackageArchive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.manifest().id, "Foo");
        assert_eq!(archive.manifest().dependencies.len(), 1);
        assert_eq!(archive.files().len(), 2);
        assert_eq!(archive.find_file("FOO.DLL").unwrap().data, b"dll");
        assert!(archive.manifest_xml().contains("<id>Foo</id>"));
    }

    #[test]
    fn test_nested_nuspec_is_payload() {
        let bytes = pack(&sample_manifest(), &[("samples/Other.nuspec", "<x/>".as_bytes())]).unwrap();
        let archive = PackageArchive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.manifest().id, "Foo");
        assert_eq!(archive.files().len(), 1);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(PackageArchive::from_bytes(b"not an archive").is_err());
    }

    #[test]
    fn test_pack_rejects_traversal() {
        assert!(pack(&sample_manifest(), &[("../evil", "x".as_bytes())]).is_err());
    }
}
