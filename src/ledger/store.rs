//! File-backed ledger storage.

use super::record::LockRecord;
use crate::clock::Sleeper;
use crate::error::Result;
use crate::fs;
use crate::mutex::{self, MutexGuard, MutexPolicy};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A ledger file plus the sentinel that serializes its writers.
///
/// Nothing is cached: every operation re-reads the file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    guard_target: PathBuf,
    policy: MutexPolicy,
}

impl Ledger {
    /// A ledger guarded by its own sentinel (`<path>.locker`).
    pub fn new(path: impl Into<PathBuf>, policy: MutexPolicy) -> Self {
        let path = path.into();
        Self {
            guard_target: path.clone(),
            path,
            policy,
        }
    }

    /// A ledger guarded by another file's sentinel.
    pub fn guarded_by(
        path: impl Into<PathBuf>,
        guard_target: impl Into<PathBuf>,
        policy: MutexPolicy,
    ) -> Self {
        Self {
            path: path.into(),
            guard_target: guard_target.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn guard_target(&self) -> &Path {
        &self.guard_target
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every record in ledger order. A missing ledger has no records.
    ///
    /// Rewrites are atomic renames, so this snapshot is consistent even
    /// without holding the sentinel.
    pub fn records(&self) -> Result<Vec<LockRecord>> {
        fs::read_lines(&self.path)?
            .iter()
            .map(|line| LockRecord::parse(line))
            .collect()
    }

    /// Run `body` with the guard target's sentinel held.
    pub fn with_lock<T>(
        &self,
        sleeper: &dyn Sleeper,
        body: impl FnOnce(&MutexGuard) -> Result<T>,
    ) -> Result<T> {
        mutex::with_mutex(&self.guard_target, self.policy, sleeper, body)
    }

    /// Append a record; the caller already holds the guard.
    pub fn append_locked(&self, held: &MutexGuard, record: &LockRecord) -> Result<()> {
        self.assert_guard(held);
        fs::append_line(&self.path, &record.to_line())?;
        info!(ledger = %self.path.display(), record = %record, "added ledger entry");
        Ok(())
    }

    /// Remove every record owned by `pid`; the caller already holds the guard.
    ///
    /// The ledger is rewritten through a temporary file and renamed into
    /// place. If nothing is left, the ledger file is deleted. Returns the
    /// number of records removed.
    pub fn remove_pid_locked(&self, held: &MutexGuard, pid: u32) -> Result<usize> {
        self.assert_guard(held);

        let records = self.records()?;
        let (removed, kept): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.pid == pid);

        if removed.is_empty() {
            debug!(ledger = %self.path.display(), pid, "no entries to remove");
            return Ok(0);
        }

        if kept.is_empty() {
            fs::remove_if_exists(&self.path)?;
            info!(ledger = %self.path.display(), pid, "ledger now empty - removed");
        } else {
            let lines: Vec<String> = kept.iter().map(LockRecord::to_line).collect();
            fs::atomic_write_lines(&self.path, &lines)?;
            info!(ledger = %self.path.display(), pid, removed = removed.len(), "removed ledger entries");
        }

        Ok(removed.len())
    }

    /// Append a record under the guard.
    pub fn append(&self, sleeper: &dyn Sleeper, record: &LockRecord) -> Result<()> {
        self.with_lock(sleeper, |held| self.append_locked(held, record))
    }

    /// Remove every record owned by `pid` under the guard.
    pub fn remove_pid(&self, sleeper: &dyn Sleeper, pid: u32) -> Result<usize> {
        self.with_lock(sleeper, |held| self.remove_pid_locked(held, pid))
    }

    fn assert_guard(&self, held: &MutexGuard) {
        debug_assert_eq!(
            held.target(),
            self.guard_target.as_path(),
            "ledger mutated under the wrong sentinel"
        );
    }
}
