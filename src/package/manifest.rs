// src/package/manifest.rs

//! `.nuspec` package manifest reading and writing
//!
//! Only the fields the acquisition engine needs are modeled: identity,
//! description, and the dependency list used for closure expansion.
//! Dependencies nested inside framework `<group>` elements are flattened.

use crate::error::{Error, Result};
use crate::package::identity::PackageIdentity;
use crate::version::{PackageVersion, VersionConstraint};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// A dependency declared by a package manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDependency {
    pub id: String,
    pub constraint: VersionConstraint,
}

/// Parsed package manifest
#[derive(Debug, Clone)]
pub struct PackageManifest {
    pub id: String,
    pub version: PackageVersion,
    pub description: Option<String>,
    pub dependencies: Vec<ManifestDependency>,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Id,
    Version,
    Description,
    Other,
}

impl PackageManifest {
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version,
            description: None,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, id: impl Into<String>, constraint: VersionConstraint) -> Self {
        self.dependencies.push(ManifestDependency {
            id: id.into(),
            constraint,
        });
        self
    }

    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::concrete(self.id.clone(), self.version.clone())
    }

    /// Manifest file name inside archives and package directories
    pub fn file_name(&self) -> String {
        format!("{}.nuspec", self.id)
    }

    /// Parse manifest XML
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut in_metadata = false;
        let mut field = Field::Other;
        let mut id = None;
        let mut version = None;
        let mut description = None;
        let mut dependencies = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"metadata" => in_metadata = true,
                    b"id" if in_metadata => field = Field::Id,
                    b"version" if in_metadata => field = Field::Version,
                    b"description" if in_metadata => field = Field::Description,
                    b"dependency" if in_metadata => dependencies.push(parse_dependency(&e)?),
                    _ => field = Field::Other,
                },
                Ok(Event::Empty(e)) => {
                    if in_metadata && e.local_name().as_ref() == b"dependency" {
                        dependencies.push(parse_dependency(&e)?);
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Manifest(e.to_string()))?
                        .into_owned();
                    match field {
                        Field::Id => id = Some(text),
                        Field::Version => version = Some(PackageVersion::parse(&text)?),
                        Field::Description => description = Some(text),
                        Field::Other => {}
                    }
                }
                Ok(Event::End(e)) => {
                    if e.local_name().as_ref() == b"metadata" {
                        in_metadata = false;
                    }
                    field = Field::Other;
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Manifest(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        let id = id.ok_or_else(|| Error::Manifest("missing <id>".to_string()))?;
        let version = version.ok_or_else(|| Error::Manifest("missing <version>".to_string()))?;

        Ok(Self {
            id,
            version,
            description,
            dependencies,
        })
    }

    /// Render manifest XML
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<package>\n  <metadata>\n");
        xml.push_str(&format!("    <id>{}</id>\n", escape(self.id.as_str())));
        xml.push_str(&format!("    <version>{}</version>\n", self.version));
        if let Some(ref description) = self.description {
            xml.push_str(&format!(
                "    <description>{}</description>\n",
                escape(description.as_str())
            ));
        }
        if !self.dependencies.is_empty() {
            xml.push_str("    <dependencies>\n");
            for dep in &self.dependencies {
                match dep.constraint {
                    VersionConstraint::Any => {
                        xml.push_str(&format!("      <dependency id=\"{}\" />\n", escape(dep.id.as_str())));
                    }
                    ref constraint => {
                        xml.push_str(&format!(
                            "      <dependency id=\"{}\" version=\"{}\" />\n",
                            escape(dep.id.as_str()),
                            escape(constraint.to_string().as_str())
                        ));
                    }
                }
            }
            xml.push_str("    </dependencies>\n");
        }
        xml.push_str("  </metadata>\n</package>\n");
        xml
    }
}

fn parse_dependency(element: &BytesStart<'_>) -> Result<ManifestDependency> {
    let mut id = None;
    let mut constraint = VersionConstraint::Any;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| Error::Manifest(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Manifest(e.to_string()))?;
        match attr.key.local_name().as_ref() {
            b"id" => id = Some(value.into_owned()),
            b"version" => constraint = VersionConstraint::parse(&value)?,
            _ => {}
        }
    }

    let id = id.ok_or_else(|| Error::Manifest("<dependency> without id".to_string()))?;
    Ok(ManifestDependency { id, constraint })
}
