// src/project/packages_config.rs

//! `packages.config` reading
//!
//! ```xml
//! <packages>
//!   <package id="Newtonsoft.Json" version="13.0.1" allowedVersions="[13,14)" />
//! </packages>
//! ```

use crate::error::{Error, Result};
use crate::package::{PackageIdentity, PackageReference};
use crate::reference::ReferenceReader;
use crate::version::{PackageVersion, VersionConstraint};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::Path;

/// Reader for `packages.config` files
#[derive(Debug, Default, Clone, Copy)]
pub struct PackagesConfigReader;

impl PackagesConfigReader {
    /// Parse file content; `path` is only used in error messages
    pub fn parse(&self, content: &str, path: &Path) -> Result<Vec<PackageReference>> {
        let malformed = |reason: String| Error::References {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = Reader::from_str(content);
        reader.trim_text(true);
        let mut references = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"package" => {
                    references.push(parse_package(&e).map_err(&malformed)?);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(malformed(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(references)
    }
}

impl ReferenceReader for PackagesConfigReader {
    fn read(&self, path: &Path) -> Result<Vec<PackageReference>> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content, path)
    }
}

fn parse_package(element: &BytesStart<'_>) -> std::result::Result<PackageReference, String> {
    let mut id = None;
    let mut version = None;
    let mut allowed = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        match attr.key.local_name().as_ref() {
            b"id" => id = Some(value.into_owned()),
            b"version" if !value.trim().is_empty() => {
                version = Some(PackageVersion::parse(&value).map_err(|e| e.to_string())?);
            }
            b"allowedVersions" if !value.trim().is_empty() => {
                allowed = Some(VersionConstraint::parse(&value).map_err(|e| e.to_string())?);
            }
            _ => {}
        }
    }

    let id = id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| "<package> without id".to_string())?;
    let mut reference = PackageReference::new(PackageIdentity::new(id, version));
    if let Some(constraint) = allowed {
        reference = reference.with_allowed_versions(constraint);
    }
    Ok(reference)
}
