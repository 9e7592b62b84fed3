//! Allocation and release against the shared usage ledger.

use super::definition::ceiling_of;
use super::usage::{self, UsageRecord, consumed};
use crate::error::{CoordError, Result};
use crate::fs;
use crate::mutex::{self, MutexPolicy};
use crate::participant::Participant;
use globset::Glob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// The resource files rooted at one definitions path.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    definitions: PathBuf,
    usage: PathBuf,
    policy: MutexPolicy,
}

impl ResourcePool {
    /// `policy` guards every read-modify-write of the usage ledger.
    pub fn new(definitions: impl Into<PathBuf>, policy: MutexPolicy) -> Self {
        let definitions = definitions.into();
        Self {
            usage: fs::with_suffix(&definitions, ".used"),
            definitions,
            policy,
        }
    }

    pub fn definitions_path(&self) -> &Path {
        &self.definitions
    }

    pub fn usage_path(&self) -> &Path {
        &self.usage
    }

    /// Private obtained ledger of `pid`.
    pub fn obtained_path(&self, pid: u32) -> PathBuf {
        fs::with_suffix(&self.definitions, &format!(".obtained.{}", pid))
    }

    /// Allocate `amount` units of `name`, waiting for capacity if needed.
    ///
    /// Each round reaps orphaned grants, then under the usage sentinel
    /// grants whatever is free (up to what is still missing) to both the
    /// shared and the private ledger. While units are missing the caller
    /// sleeps one poll interval; after more than `timeout_ticks` rounds every
    /// grant made by this call is returned and the call fails.
    ///
    /// # Errors
    ///
    /// * `ResourceExhausted` - `amount` exceeds the resource's ceiling
    /// * `UserError` - the resource is not defined
    /// * `LockTimeout` - capacity did not free up in time
    /// * `LedgerCorruption` - more units are in use than the ceiling allows
    pub fn allocate(
        &self,
        participant: &Participant,
        name: &str,
        amount: u32,
        timeout_ticks: u32,
    ) -> Result<()> {
        info!(resource = name, amount, timeout_ticks, "allocating resource");

        if amount == 0 {
            debug!(resource = name, "nothing requested");
            return Ok(());
        }

        let ceiling = ceiling_of(&self.definitions, name)?;
        debug!(resource = name, ceiling, "maximum units");
        if amount > ceiling {
            return Err(CoordError::ResourceExhausted(format!(
                "resource {} has maximum value {}, attempting to get {}",
                name, ceiling, amount
            )));
        }

        let mut granted = Vec::new();
        let outcome = self.allocate_rounds(participant, name, amount, ceiling, timeout_ticks, &mut granted);

        if let Err(err) = &outcome
            && !granted.is_empty()
        {
            warn!(resource = name, error = %err, "allocation failed - returning partial grants");
            if let Err(rollback) = self.return_grants(participant, &granted) {
                error!(resource = name, error = %rollback, "failed to return partial grants");
            }
        }

        outcome
    }

    fn allocate_rounds(
        &self,
        participant: &Participant,
        name: &str,
        amount: u32,
        ceiling: u32,
        timeout_ticks: u32,
        granted: &mut Vec<UsageRecord>,
    ) -> Result<()> {
        let obtained = self.obtained_path(participant.pid);
        let mut remaining = amount;
        let mut ticks = 0u32;

        loop {
            self.reap_orphans(participant)?;

            let grant = mutex::with_mutex(&self.usage, self.policy, participant.sleeper.as_ref(), |_| {
                let used = consumed(&usage::read_records(&self.usage)?, name);
                let free = i64::from(ceiling) - used as i64;
                debug!(resource = name, used, free, "current usage");

                if free < 0 {
                    error!(resource = name, used, ceiling, "negative free capacity");
                    return Err(CoordError::LedgerCorruption(format!(
                        "resource {} has {} units in use against a maximum of {}; fix '{}'",
                        name,
                        used,
                        ceiling,
                        self.usage.display()
                    )));
                }

                if free == 0 {
                    info!(resource = name, "no resources currently available");
                    return Ok(None);
                }

                let record = UsageRecord::new(name, remaining.min(free as u32));
                self.record_grant(&obtained, &record)?;
                Ok(Some(record))
            })?;

            if let Some(record) = grant {
                remaining -= record.amount;
                granted.push(record);
            }

            if remaining == 0 {
                info!(resource = name, amount, "allocation complete");
                return Ok(());
            }

            ticks += 1;
            if ticks > timeout_ticks {
                warn!(resource = name, remaining, ticks, "timed out waiting for resource");
                return Err(CoordError::LockTimeout(format!(
                    "unable to obtain {} units for resource {}",
                    amount, name
                )));
            }

            info!(resource = name, remaining, interval = ?participant.timing.poll_interval, "allocation incomplete - sleeping");
            participant.sleeper.sleep(participant.timing.poll_interval)?;
        }
    }

    /// Append a grant to the usage ledger and the private ledger.
    ///
    /// Caller holds the usage sentinel. If the private append fails the
    /// usage line is taken back so the two ledgers agree.
    fn record_grant(&self, obtained: &Path, record: &UsageRecord) -> Result<()> {
        fs::append_line(&self.usage, &record.to_line())?;

        if let Err(err) = fs::append_line(obtained, &record.to_line()) {
            usage::remove_first_matches(&self.usage, std::slice::from_ref(record))?;
            return Err(err);
        }

        info!(record = %record, "added usage entry");
        Ok(())
    }

    /// Allocate several resources in name order.
    pub fn allocate_all(
        &self,
        participant: &Participant,
        requests: &BTreeMap<String, u32>,
        timeout_ticks: u32,
    ) -> Result<()> {
        for (name, amount) in requests {
            self.allocate(participant, name, *amount, timeout_ticks)?;
        }
        Ok(())
    }

    /// Return the grants made by one failed `allocate` call.
    fn return_grants(&self, participant: &Participant, granted: &[UsageRecord]) -> Result<()> {
        let obtained = self.obtained_path(participant.pid);

        mutex::with_mutex(&self.usage, self.policy, participant.sleeper.as_ref(), |_| {
            for missing in usage::remove_first_matches(&self.usage, granted)? {
                warn!(record = %missing, "grant missing from usage ledger");
            }
            usage::remove_first_matches(&obtained, granted)?;
            Ok(())
        })
    }

    /// Release every grant listed in `obtained` and delete that ledger.
    ///
    /// One usage line is removed per obtained line. Idempotent: a missing
    /// obtained ledger releases nothing. Returns the number of grants
    /// released.
    pub fn release(&self, participant: &Participant, obtained: &Path) -> Result<usize> {
        mutex::with_mutex(&self.usage, self.policy, participant.sleeper.as_ref(), |_| {
            let returned = usage::read_records(obtained)?;
            if returned.is_empty() {
                fs::remove_if_exists(obtained)?;
                return Ok(0);
            }

            for missing in usage::remove_first_matches(&self.usage, &returned)? {
                warn!(record = %missing, "grant missing from usage ledger");
            }
            fs::remove_if_exists(obtained)?;

            info!(obtained = %obtained.display(), released = returned.len(), "released resources");
            Ok(returned.len())
        })
    }

    /// Release everything this participant holds.
    pub fn release_own(&self, participant: &Participant) -> Result<usize> {
        self.release(participant, &self.obtained_path(participant.pid))
    }

    /// Release the grants of every process that is no longer running.
    ///
    /// Returns the pids whose obtained ledgers were released.
    pub fn reap_orphans(&self, participant: &Participant) -> Result<Vec<u32>> {
        let mut reaped = Vec::new();

        for (pid, path) in self.obtained_ledgers()? {
            if pid == participant.pid {
                continue;
            }

            let liveness = participant.liveness(pid);
            if liveness.is_instance() {
                debug!(pid, "obtained ledger belongs to a running job");
                continue;
            }

            warn!(pid, %liveness, obtained = %path.display(), "orphaned resources - releasing");
            self.release(participant, &path)?;
            reaped.push(pid);
        }

        Ok(reaped)
    }

    /// Every `<base>.obtained.<pid>` ledger in the definitions directory.
    /// A missing directory holds none.
    pub fn obtained_ledgers(&self) -> Result<Vec<(u32, PathBuf)>> {
        let base = self
            .definitions
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CoordError::UserError(format!(
                    "resource file '{}' has no usable file name",
                    self.definitions.display()
                ))
            })?;
        let prefix = format!("{}.obtained.", base);

        let matcher = Glob::new(&format!("{}*", globset::escape(&prefix)))
            .map_err(|e| CoordError::UserError(format!("invalid resource file name '{}': {}", base, e)))?
            .compile_matcher();

        let dir = match self.definitions.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoordError::IoFailure(format!(
                    "failed to list '{}': {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut ledgers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                CoordError::IoFailure(format!("failed to list '{}': {}", dir.display(), e))
            })?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !matcher.is_match(file_name) {
                continue;
            }

            match file_name[prefix.len()..].parse::<u32>() {
                Ok(pid) => ledgers.push((pid, entry.path())),
                Err(_) => debug!(file = file_name, "ignoring file without a pid suffix"),
            }
        }

        ledgers.sort();
        Ok(ledgers)
    }

    /// Grants listed in the obtained ledger at `path`.
    pub fn grants_in(&self, path: &Path) -> Result<Vec<UsageRecord>> {
        usage::read_records(path)
    }

    /// Consumed units per resource name, in name order.
    pub fn usage_by_name(&self) -> Result<BTreeMap<String, u64>> {
        let mut totals = BTreeMap::new();
        for record in usage::read_records(&self.usage)? {
            *totals.entry(record.name).or_insert(0) += u64::from(record.amount);
        }
        Ok(totals)
    }
}
