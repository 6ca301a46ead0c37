// src/package/mod.rs

//! Package data model
//!
//! - [`PackageIdentity`] / [`PackageReference`]: what scopes declare
//! - [`PackageManifest`]: the `.nuspec` metadata inside every package
//! - [`PackageArchive`]: the decoded `.nupkg` download

mod archive;
mod identity;
mod manifest;

pub use archive::{pack, ArchiveEntry, PackageArchive, MAX_ENTRY_SIZE};
pub use identity::{fold_name, strip_name_prefix, PackageIdentity, PackageReference};
pub use manifest::{ManifestDependency, PackageManifest};
