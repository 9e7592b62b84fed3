//! Static resource ceilings.

use crate::error::{CoordError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// One `name:max` line of the definitions file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDefinition {
    pub name: String,
    pub max: u32,
}

impl ResourceDefinition {
    fn parse(line: &str, path: &Path) -> Result<Self> {
        let (name, max) = line.split_once(':').ok_or_else(|| {
            CoordError::UserError(format!(
                "resource definition '{}' in '{}' is not of the form name:max",
                line,
                path.display()
            ))
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(CoordError::UserError(format!(
                "resource definition '{}' in '{}' has an empty name",
                line,
                path.display()
            )));
        }

        let max = max.trim().parse::<u32>().map_err(|_| {
            CoordError::UserError(format!(
                "resource {} not configured properly in '{}' with value '{}'",
                name,
                path.display(),
                max.trim()
            ))
        })?;

        Ok(Self {
            name: name.to_string(),
            max,
        })
    }
}

/// Load every definition, skipping blank and `#` comment lines.
///
/// A missing file is a configuration error: resources were requested but
/// none are defined.
pub fn load_definitions(path: &Path) -> Result<Vec<ResourceDefinition>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CoordError::UserError(format!(
            "unable to find resource file '{}'",
            path.display()
        )),
        _ => CoordError::IoFailure(format!("failed to read '{}': {}", path.display(), e)),
    })?;

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| ResourceDefinition::parse(line, path))
        .collect()
}

/// Ceiling of `name`; the first definition wins if a name is repeated.
pub(super) fn ceiling_of(path: &Path, name: &str) -> Result<u32> {
    load_definitions(path)?
        .into_iter()
        .find(|d| d.name == name)
        .map(|d| d.max)
        .ok_or_else(|| {
            CoordError::UserError(format!(
                "resource {} not found in file '{}'",
                name,
                path.display()
            ))
        })
}
