//! Usage and obtained ledger lines.

use crate::error::{CoordError, Result};
use crate::fs;
use std::path::Path;

/// A `name:amount` grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub name: String,
    pub amount: u32,
}

impl UsageRecord {
    pub fn new(name: impl Into<String>, amount: u32) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }

    pub fn parse(line: &str) -> Result<Self> {
        let (name, amount) = line
            .split_once(':')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| {
                CoordError::LedgerCorruption(format!("usage record '{}' has no name", line))
            })?;

        let amount = amount.parse::<u32>().map_err(|_| {
            CoordError::LedgerCorruption(format!(
                "usage record '{}' has an invalid amount",
                line
            ))
        })?;

        Ok(Self::new(name, amount))
    }

    pub fn to_line(&self) -> String {
        format!("{}:{}", self.name, self.amount)
    }
}

impl std::fmt::Display for UsageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

/// Read every grant in a usage or obtained ledger.
pub(super) fn read_records(path: &Path) -> Result<Vec<UsageRecord>> {
    fs::read_lines(path)?
        .iter()
        .map(|line| UsageRecord::parse(line))
        .collect()
}

/// Total amount granted for `name`.
pub fn consumed(records: &[UsageRecord], name: &str) -> u64 {
    records
        .iter()
        .filter(|r| r.name == name)
        .map(|r| u64::from(r.amount))
        .sum()
}

/// Remove one matching line per entry of `returned`, first match each.
///
/// Entries with no matching line are reported back. The ledger is deleted
/// if nothing is left. The caller holds whatever sentinel guards `path`.
pub(super) fn remove_first_matches(
    path: &Path,
    returned: &[UsageRecord],
) -> Result<Vec<UsageRecord>> {
    let mut records = read_records(path)?;
    let mut unmatched = Vec::new();

    for record in returned {
        match records.iter().position(|r| r == record) {
            Some(idx) => {
                records.remove(idx);
            }
            None => unmatched.push(record.clone()),
        }
    }

    if records.is_empty() {
        fs::remove_if_exists(path)?;
    } else {
        let lines: Vec<String> = records.iter().map(UsageRecord::to_line).collect();
        fs::atomic_write_lines(path, &lines)?;
    }

    Ok(unmatched)
}
