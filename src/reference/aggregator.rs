// src/reference/aggregator.rs

//! Merging declared references across scopes

use crate::error::{Error, Result};
use crate::package::PackageReference;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A consumer (project or solution) and the file declaring its references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub name: String,
    pub references_file: PathBuf,
}

impl Scope {
    pub fn new(name: impl Into<String>, references_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            references_file: references_file.into(),
        }
    }
}

/// How scope read failures are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Many scopes from a solution; an unreadable scope is a warning
    Aggregate,
    /// One file the operator named explicitly; any read failure is fatal
    Single,
}

/// Reads the references one scope declares
pub trait ReferenceReader: Send + Sync {
    /// Declared references, in file order
    ///
    /// A missing file is reported as `Error::Io` with `ErrorKind::NotFound`.
    fn read(&self, path: &std::path::Path) -> Result<Vec<PackageReference>>;
}

/// Mapping from each distinct reference to the scopes declaring it
///
/// Entries keep first-seen order, and so does each scope list.
#[derive(Debug, Clone, Default)]
pub struct InstalledReferenceMap {
    entries: Vec<(PackageReference, Vec<String>)>,
    index: HashMap<PackageReference, usize>,
}

impl InstalledReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(scope, references)` pairs in order
    pub fn aggregate<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<PackageReference>)>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for (scope, references) in scopes {
            for reference in references {
                map.insert(scope.as_ref(), reference);
            }
        }
        map
    }

    /// Record that `scope` declares `reference`
    pub fn insert(&mut self, scope: &str, reference: PackageReference) {
        match self.index.get(&reference) {
            Some(&i) => {
                let scopes = &mut self.entries[i].1;
                if !scopes.iter().any(|s| s == scope) {
                    scopes.push(scope.to_string());
                }
            }
            None => {
                self.index.insert(reference.clone(), self.entries.len());
                self.entries.push((reference, vec![scope.to_string()]));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scopes declaring `reference`, in first-seen order
    pub fn scopes_for(&self, reference: &PackageReference) -> Option<&[String]> {
        self.index
            .get(reference)
            .map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageReference, &[String])> {
        self.entries.iter().map(|(r, s)| (r, s.as_slice()))
    }

    pub fn references(&self) -> impl Iterator<Item = &PackageReference> {
        self.entries.iter().map(|(r, _)| r)
    }
}

/// Aggregated references plus the non-fatal problems found reading them
#[derive(Debug, Default)]
pub struct ScopeLoad {
    pub map: InstalledReferenceMap,
    pub warnings: Vec<String>,
}

/// Read every scope's file and aggregate the results
///
/// In [`ScopeMode::Aggregate`], a missing file contributes nothing and an
/// unreadable one becomes a warning. In [`ScopeMode::Single`] both are
/// `Error::ScopeRead`.
pub fn load_scopes(scopes: &[Scope], reader: &dyn ReferenceReader, mode: ScopeMode) -> Result<ScopeLoad> {
    let mut load = ScopeLoad::default();

    for scope in scopes {
        match reader.read(&scope.references_file) {
            Ok(references) => {
                debug!("Scope '{}' declares {} package(s)", scope.name, references.len());
                for reference in references {
                    load.map.insert(&scope.name, reference);
                }
            }
            Err(e) if mode == ScopeMode::Single => {
                return Err(Error::ScopeRead {
                    scope: scope.name.clone(),
                    path: scope.references_file.clone(),
                    reason: e.to_string(),
                });
            }
            Err(Error::Io(ref io)) if io.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Scope '{}' has no references file at {}",
                    scope.name,
                    scope.references_file.display()
                );
            }
            Err(e) => {
                let message = format!(
                    "Skipping '{}': cannot read {}: {}",
                    scope.name,
                    scope.references_file.display(),
                    e
                );
                warn!("{}", message);
                load.warnings.push(message);
            }
        }
    }

    Ok(load)
}
