//! Named advisory locks between job runs.

use super::record::LockRecord;
use super::store::Ledger;
use crate::error::{CoordError, Result};
use crate::participant::Participant;
use crate::process::Liveness;
use tracing::{debug, info, warn};

/// Outcome of one check of the ledger during acquisition.
enum Attempt {
    Acquired,
    AlreadyHeld,
    HeldBy(u32),
}

impl Ledger {
    /// Acquire the named lock `name` for `participant`.
    ///
    /// Each check first reaps stale records for `name`, then, under the
    /// ledger's sentinel, looks for a live holder. With no live holder the
    /// participant's record is appended in the same critical section.
    /// Otherwise the participant sleeps one poll interval and retries; after
    /// more than `timeout_ticks` waits the acquisition fails with
    /// `LockTimeout`.
    pub fn acquire_named(
        &self,
        participant: &Participant,
        name: &str,
        timeout_ticks: u32,
    ) -> Result<()> {
        info!(ledger = %self.path().display(), lock = name, timeout_ticks, "acquiring named lock");

        let mut waited = 0u32;
        loop {
            self.reap_stale(participant, name, 0)?;

            let attempt = self.with_lock(participant.sleeper.as_ref(), |held| {
                let records = self.records()?;

                if let Some(holder) = records.iter().find(|r| {
                    r.name == name && r.pid != participant.pid && participant.is_live_instance(r.pid)
                }) {
                    return Ok(Attempt::HeldBy(holder.pid));
                }

                if records
                    .iter()
                    .any(|r| r.name == name && r.pid == participant.pid)
                {
                    return Ok(Attempt::AlreadyHeld);
                }

                self.append_locked(held, &LockRecord::new(participant.pid, name))?;
                Ok(Attempt::Acquired)
            })?;

            match attempt {
                Attempt::Acquired => {
                    info!(lock = name, pid = participant.pid, "named lock acquired");
                    return Ok(());
                }
                Attempt::AlreadyHeld => {
                    debug!(lock = name, pid = participant.pid, "named lock already held by us");
                    return Ok(());
                }
                Attempt::HeldBy(holder) => {
                    waited += 1;
                    warn!(lock = name, holder, waited, "process has already locked this name");
                    if waited > timeout_ticks {
                        return Err(CoordError::LockTimeout(format!(
                            "unable to obtain lock '{}' held by process {} after {} checks",
                            name, holder, waited
                        )));
                    }
                    info!(interval = ?participant.timing.poll_interval, "sleeping before next lock check");
                    participant.sleeper.sleep(participant.timing.poll_interval)?;
                }
            }
        }
    }

    /// Remove every record belonging to `pid`.
    ///
    /// Safe to call repeatedly: a missing ledger or a pid with no records is
    /// a no-op. Returns the number of records removed.
    pub fn release_named(&self, participant: &Participant, pid: u32) -> Result<usize> {
        self.remove_pid(participant.sleeper.as_ref(), pid)
    }

    /// Reap records for `name` whose process is dead or runs another program.
    ///
    /// Records at a ledger position below `keep_first_n` are kept even when
    /// stale; the caller's own records are never reaped. Returns the pids
    /// that were removed, in ledger order.
    pub fn reap_stale(
        &self,
        participant: &Participant,
        name: &str,
        keep_first_n: usize,
    ) -> Result<Vec<u32>> {
        let records = self.records()?;
        let mut stale: Vec<u32> = Vec::new();

        for (position, record) in records.iter().enumerate() {
            if record.pid == participant.pid || record.name != name || stale.contains(&record.pid) {
                continue;
            }

            match participant.liveness(record.pid) {
                Liveness::Instance => {
                    debug!(pid = record.pid, lock = name, "valid entry");
                }
                liveness if position < keep_first_n => {
                    warn!(pid = record.pid, position, %liveness, "stale entry within protected positions - keeping");
                }
                liveness => {
                    warn!(pid = record.pid, lock = name, %liveness, "stale entry - removing");
                    stale.push(record.pid);
                }
            }
        }

        for pid in &stale {
            self.release_named(participant, *pid)?;
        }

        Ok(stale)
    }
}
