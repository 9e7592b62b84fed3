//! Filesystem utilities for rmanrun.
//!
//! Every ledger is a plain newline-terminated text file. This module provides
//! the three primitive mutations the coordination layer needs: append one
//! line, atomically rewrite a filtered set of lines, and remove a file that
//! may already be gone.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_lines};

use crate::error::{CoordError, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// `path` with `suffix` appended to its final component.
///
/// Every derived coordination file (`.locker`, `.used`, `.<pid>.reset`)
/// is named this way.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Append a single newline-terminated line, creating the file if needed.
pub fn append_line<P: AsRef<Path>>(path: P, line: &str) -> Result<()> {
    let path = path.as_ref();

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            CoordError::IoFailure(format!("failed to open '{}': {}", path.display(), e))
        })?;

    file.write_all(format!("{}\n", line).as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            CoordError::IoFailure(format!("failed to append to '{}': {}", path.display(), e))
        })
}

/// Read all non-empty lines of a file.
///
/// A missing file reads as empty: every ledger is deleted once it has no
/// records left.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();

    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CoordError::IoFailure(format!(
            "failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Remove a file, treating "already absent" as success.
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();

    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CoordError::IoFailure(format!(
            "failed to remove '{}': {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_creates_and_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger");

        append_line(&path, "101 nightly").unwrap();
        append_line(&path, "102 weekly").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "101 nightly\n102 weekly\n"
        );
    }

    #[test]
    fn read_lines_of_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_lines(temp_dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn read_lines_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger");
        fs::write(&path, "tape:1\n\ntape:2\r\n").unwrap();

        assert_eq!(read_lines(&path).unwrap(), vec!["tape:1", "tape:2"]);
    }

    #[test]
    fn with_suffix_appends_to_file_name() {
        assert_eq!(
            with_suffix(Path::new("/srv/config/rman.cfg"), ".4242.reset"),
            Path::new("/srv/config/rman.cfg.4242.reset")
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        fs::write(&path, "x").unwrap();

        assert!(remove_if_exists(&path).unwrap());
        assert!(!remove_if_exists(&path).unwrap());
    }
}
