//! Atomic ledger rewrites.
//!
//! Ledgers are never edited in place. A rewrite follows this pattern:
//! 1. Write the surviving lines to a fresh temporary file next to the ledger
//! 2. Sync the file to disk (fsync)
//! 3. `rename()` it over the ledger
//!
//! Readers that open the ledger concurrently therefore see either the old or
//! the new content, never a partial file. Rename is only atomic within one
//! filesystem, which is why the temporary file lives in the ledger's directory.
//!
//! The temporary name carries the writer's pid (`.{filename}.{pid}.tmp`) so a
//! temp file abandoned by a crashed writer never collides with a live one.

use crate::error::{CoordError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`.
///
/// The parent directory must already exist: ledgers live in directories that
/// are configuration, and a missing one is reported rather than created.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path)?;

    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        CoordError::IoFailure(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically replace `path` with the given lines, each newline-terminated.
pub fn atomic_write_lines<P: AsRef<Path>, S: AsRef<str>>(path: P, lines: &[S]) -> Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    atomic_write(path, content.as_bytes())
}

/// Temporary path used while rewriting `target`.
pub(crate) fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CoordError::IoFailure(format!("invalid ledger path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.{}.tmp", filename, std::process::id())))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        CoordError::IoFailure(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        CoordError::IoFailure(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        CoordError::IoFailure(format!(
            "failed to sync temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}
