//! Entering and leaving the reset queue.

use super::baseline::{capture, desired_settings, missing_from};
use crate::engine::Engine;
use crate::error::{CoordError, Result};
use crate::fs;
use crate::ledger::{Ledger, LockRecord};
use crate::mutex::{MutexGuard, MutexPolicy};
use crate::participant::Participant;
use crate::process::Liveness;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Name shared by every queue record; the queue is not a mutex.
pub const QUEUE_NAME: &str = "0";

/// What `reset_config` decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// This job never entered the protocol.
    NotEntered,
    /// Sole survivor: restored from its own baseline.
    Restored,
    /// The dead leader's baseline was adopted and restored.
    AdoptedLeader(u32),
    /// The leader is still running and will restore when it exits.
    LeftToLeader(u32),
    /// The leader is dead but more than one job still depends on it.
    Deferred(u32),
    /// This job leads and others are still running; its baseline stays.
    HeldForSurvivors,
}

/// The reset protocol for one desired configuration file.
pub struct ResetProtocol {
    config_file: PathBuf,
    queue: Ledger,
    engine: Arc<dyn Engine>,
    entered: AtomicBool,
}

impl ResetProtocol {
    /// `policy` guards the configuration file; it must allow for a slow
    /// engine snapshot.
    pub fn new(config_file: impl Into<PathBuf>, engine: Arc<dyn Engine>, policy: MutexPolicy) -> Self {
        let config_file = config_file.into();
        Self {
            queue: Ledger::guarded_by(
                Self::queue_path_of(&config_file),
                config_file.clone(),
                policy,
            ),
            config_file,
            engine,
            entered: AtomicBool::new(false),
        }
    }

    /// Queue ledger of `config_file`: `<config>.lock`.
    pub fn queue_path_of(config_file: &Path) -> PathBuf {
        fs::with_suffix(config_file, ".lock")
    }

    /// Baseline snapshot of `config_file` taken by `pid`.
    pub fn baseline_path_of(config_file: &Path, pid: u32) -> PathBuf {
        fs::with_suffix(config_file, &format!(".{}.reset", pid))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn queue(&self) -> &Ledger {
        &self.queue
    }

    /// Baseline snapshot taken by `pid`.
    pub fn baseline_path(&self, pid: u32) -> PathBuf {
        Self::baseline_path_of(&self.config_file, pid)
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    /// Join the queue, snapshot the engine configuration, and apply the
    /// desired settings if no other job was queued.
    pub fn check_config(&self, participant: &Participant) -> Result<()> {
        info!(config = %self.config_file.display(), "checking RMAN configuration");

        let desired = desired_settings(&self.config_file)?;
        let baseline_path = self.baseline_path(participant.pid);

        self.queue.with_lock(participant.sleeper.as_ref(), |held| {
            let first = !self.queue.exists();

            self.queue
                .append_locked(held, &LockRecord::new(participant.pid, QUEUE_NAME))?;
            self.entered.store(true, Ordering::SeqCst);

            let baseline = capture(self.engine.as_ref())?;
            fs::atomic_write_lines(&baseline_path, &baseline)?;
            info!(baseline = %baseline_path.display(), settings = baseline.len(), "saved RMAN configuration");

            if first {
                self.apply_missing(&desired, &baseline)?;
            } else {
                info!("configuration already in use by another job - not applying");
            }
            Ok(())
        })
    }

    /// Leave the queue, restoring the baseline if this job is the last one
    /// depending on it.
    ///
    /// A second call after a completed reset is a no-op.
    pub fn reset_config(&self, participant: &Participant) -> Result<ResetOutcome> {
        if !self.is_entered() {
            debug!(config = %self.config_file.display(), "configuration never checked - nothing to reset");
            return Ok(ResetOutcome::NotEntered);
        }

        info!(config = %self.config_file.display(), "resetting the configuration");

        for pid in self.queue.reap_stale(participant, QUEUE_NAME, 1)? {
            let reaped = self.baseline_path(pid);
            if !fs::remove_if_exists(&reaped)? {
                warn!(baseline = %reaped.display(), "baseline has already been removed");
            }
        }

        let outcome = self
            .queue
            .with_lock(participant.sleeper.as_ref(), |held| self.leave(held, participant))?;

        self.entered.store(false, Ordering::SeqCst);
        info!(outcome = ?outcome, "reset complete");
        Ok(outcome)
    }

    fn leave(&self, held: &MutexGuard, participant: &Participant) -> Result<ResetOutcome> {
        let records = self.queue.records()?;
        debug!(queue = records.len(), "jobs using the configuration");

        let Some(leader) = records.first().map(|r| r.pid) else {
            error!(queue = %self.queue.path().display(), "queue ledger is missing or empty");
            return Err(CoordError::LedgerCorruption(format!(
                "queue ledger '{}' is missing or empty",
                self.queue.path().display()
            )));
        };

        if records.len() == 1 {
            if leader != participant.pid {
                error!(leader, pid = participant.pid, "only entry in the queue is not our own");
                return Err(CoordError::LedgerCorruption(format!(
                    "only entry in '{}' belongs to process {}, not {}",
                    self.queue.path().display(),
                    leader,
                    participant.pid
                )));
            }

            self.restore_from(&self.baseline_path(participant.pid))?;
            self.remove_entry(held, participant.pid)?;
            return Ok(ResetOutcome::Restored);
        }

        if !records.iter().any(|r| r.pid == participant.pid) {
            error!(pid = participant.pid, "own entry missing from the queue");
            return Err(CoordError::LedgerCorruption(format!(
                "entry for process {} is missing from '{}'",
                participant.pid,
                self.queue.path().display()
            )));
        }

        if leader == participant.pid {
            warn!("other jobs are using this configuration - leaving entry in queue");
            return Ok(ResetOutcome::HeldForSurvivors);
        }

        let outcome = match participant.liveness(leader) {
            Liveness::Instance => {
                warn!(leader, "leader is still running - it will reset the configuration");
                ResetOutcome::LeftToLeader(leader)
            }
            liveness if records.len() == 2 => {
                warn!(leader, %liveness, "leader is gone - adopting its baseline");
                self.restore_from(&self.baseline_path(leader))?;
                self.remove_entry(held, leader)?;
                ResetOutcome::AdoptedLeader(leader)
            }
            liveness => {
                warn!(leader, %liveness, queue = records.len(), "leader is gone but others remain - deferring");
                ResetOutcome::Deferred(leader)
            }
        };

        self.remove_entry(held, participant.pid)?;
        Ok(outcome)
    }

    fn restore_from(&self, baseline_path: &Path) -> Result<()> {
        if !baseline_path.exists() {
            warn!(baseline = %baseline_path.display(), "baseline missing - nothing to restore");
            return Ok(());
        }

        let baseline = fs::read_lines(baseline_path)?;
        let current = capture(self.engine.as_ref())?;
        info!(baseline = %baseline_path.display(), "restoring RMAN configuration");
        self.apply_missing(&baseline, &current)
    }

    fn apply_missing(&self, wanted: &[String], current: &[String]) -> Result<()> {
        let changes = missing_from(wanted, current);
        if changes.is_empty() {
            info!("no changes to be made");
            return Ok(());
        }

        for change in &changes {
            debug!(setting = change.as_str(), "applying");
        }
        self.engine.apply_config(&changes)
    }

    fn remove_entry(&self, held: &MutexGuard, pid: u32) -> Result<()> {
        self.queue.remove_pid_locked(held, pid)?;
        fs::remove_if_exists(self.baseline_path(pid))?;
        Ok(())
    }
}

impl std::fmt::Debug for ResetProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetProtocol")
            .field("config_file", &self.config_file)
            .field("queue", &self.queue)
            .field("entered", &self.is_entered())
            .finish()
    }
}
