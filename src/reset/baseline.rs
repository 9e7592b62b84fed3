//! Baseline capture and configuration diffs.

use crate::engine::Engine;
use crate::error::{CoordError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const CONFIGURE_PREFIX: &str = "CONFIGURE ";

/// Keep only the explicit `CONFIGURE ...` lines of `show all` output.
pub fn configured_lines<S: AsRef<str>>(output: &[S]) -> Vec<String> {
    output
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| line.starts_with(CONFIGURE_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Current configuration of the engine, reduced to `CONFIGURE` lines.
pub(super) fn capture(engine: &dyn Engine) -> Result<Vec<String>> {
    Ok(configured_lines(&engine.capture_config()?))
}

/// Settings listed in a desired configuration file.
///
/// Blank lines and `#` comments are skipped.
pub fn desired_settings(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CoordError::UserError(format!(
            "unable to open RMAN config file '{}'",
            path.display()
        )),
        _ => CoordError::IoFailure(format!("failed to read '{}': {}", path.display(), e)),
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Lines of `wanted` that do not appear verbatim in `current`.
pub fn missing_from(wanted: &[String], current: &[String]) -> Vec<String> {
    wanted
        .iter()
        .filter(|line| !current.contains(line))
        .cloned()
        .collect()
}
