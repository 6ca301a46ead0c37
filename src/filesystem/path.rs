// src/filesystem/path.rs

//! Path utilities for archive entries and configured directories
//!
//! Archive entry names come from feeds and are untrusted: they must never
//! resolve outside the package directory they are extracted into. Directory
//! settings come from users and may mix separator styles.

use crate::error::{Error, Result};
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

/// Sanitize an archive entry name into a relative path
///
/// Rejects `..` components and empty names, strips leading separators and
/// `.` components. Backslashes are treated as separators so entries written
/// on Windows land in the same place everywhere.
///
/// # Examples
///
/// ```
/// use nupack::filesystem::path::sanitize_entry_path;
/// use std::path::PathBuf;
///
/// assert_eq!(sanitize_entry_path("lib/net45/Foo.dll").unwrap(), PathBuf::from("lib/net45/Foo.dll"));
/// assert_eq!(sanitize_entry_path("/content\\readme.txt").unwrap(), PathBuf::from("content/readme.txt"));
/// assert!(sanitize_entry_path("../evil.dll").is_err());
/// ```
pub fn sanitize_entry_path(name: &str) -> Result<PathBuf> {
    let unified = name.replace('\\', "/");
    let relative = unified.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::Archive(format!(
                    "entry '{}' escapes the package directory",
                    name
                )));
            }
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::Archive(format!("entry '{}' has an empty path", name)));
    }

    Ok(normalized)
}

/// Rewrite both `/` and `\` to the host's native separator
pub fn normalize_separators(path: &str) -> PathBuf {
    let native: String = path
        .chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect();
    PathBuf::from(native)
}

/// Resolve a user-supplied directory against a base directory
///
/// Absolute paths are kept; relative ones are joined onto `base`. Separators
/// are normalized and `.`/`..` components collapsed lexically (the target
/// usually does not exist yet, so canonicalization is not an option).
pub fn absolutize(base: &Path, path: &str) -> PathBuf {
    let normalized = normalize_separators(path);
    let joined = if normalized.is_absolute() {
        normalized
    } else {
        base.join(normalized)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_entry_normal() {
        assert_eq!(
            sanitize_entry_path("lib/Foo.dll").unwrap(),
            PathBuf::from("lib/Foo.dll")
        );
        assert_eq!(
            sanitize_entry_path("./tools/./install.ps1").unwrap(),
            PathBuf::from("tools/install.ps1")
        );
    }

    #[test]
    fn test_sanitize_entry_backslashes() {
        assert_eq!(
            sanitize_entry_path("lib\\net45\\Foo.dll").unwrap(),
            PathBuf::from("lib/net45/Foo.dll")
        );
    }

    #[test]
    fn test_sanitize_entry_traversal_rejected() {
        assert!(sanitize_entry_path("..").is_err());
        assert!(sanitize_entry_path("lib/../../etc/passwd").is_err());
        assert!(sanitize_entry_path("..\\..\\evil").is_err());
    }

    #[test]
    fn test_sanitize_entry_empty_rejected() {
        assert!(sanitize_entry_path("").is_err());
        assert!(sanitize_entry_path("/").is_err());
        assert!(sanitize_entry_path("./").is_err());
    }

    #[test]
    fn test_normalize_separators() {
        let expected: PathBuf = ["a", "b", "c"].iter().collect();
        assert_eq!(normalize_separators("a/b\\c"), expected);
    }

    #[test]
    #[cfg(unix)]
    fn test_absolutize() {
        let base = Path::new("/work/solution");
        assert_eq!(
            absolutize(base, "packages"),
            PathBuf::from("/work/solution/packages")
        );
        assert_eq!(
            absolutize(base, "../shared/packages"),
            PathBuf::from("/work/shared/packages")
        );
        assert_eq!(absolutize(base, "/opt/pkgs"), PathBuf::from("/opt/pkgs"));
    }
}
