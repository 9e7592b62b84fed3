//! One ledger line.

use crate::error::{CoordError, Result};

/// A `<pid> <name>` line: process `pid` holds (or queues for) `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    pub name: String,
}

impl LockRecord {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }

    /// Parse a ledger line. Everything after the first space is the name.
    pub fn parse(line: &str) -> Result<Self> {
        let (pid, name) = line.split_once(' ').ok_or_else(|| {
            CoordError::LedgerCorruption(format!("lock record '{}' has no name", line))
        })?;

        let pid = pid.parse::<u32>().map_err(|_| {
            CoordError::LedgerCorruption(format!("lock record '{}' has an invalid pid", line))
        })?;

        if name.is_empty() {
            return Err(CoordError::LedgerCorruption(format!(
                "lock record '{}' has an empty name",
                line
            )));
        }

        Ok(Self::new(pid, name))
    }

    /// The line as written to the ledger (without the newline).
    pub fn to_line(&self) -> String {
        format!("{} {}", self.pid, self.name)
    }
}

impl std::fmt::Display for LockRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_line())
    }
}
