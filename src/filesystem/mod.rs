// src/filesystem/mod.rs

//! Filesystem helpers shared by extraction and self-update
//!
//! Anything written into the shared packages folder goes through a
//! temporary name first so a crash or cancellation never leaves a file that
//! looks complete.

pub mod path;

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Write `content` to `path` atomically (write to temp, then rename)
///
/// The temporary file lives in the destination directory so the final
/// rename never crosses filesystems.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".nupack-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
