//! Identity and capabilities of one coordinating process.
//!
//! Every ledger operation acts on behalf of a participant: the pid written
//! into records, the program name other processes use to validate those
//! records, the process table used to judge staleness, and the sleeper that
//! implements every polling wait.

use crate::clock::Sleeper;
use crate::mutex::MutexPolicy;
use crate::process::{Liveness, ProcessTable, classify};
use std::sync::Arc;
use std::time::Duration;

/// Polling and wait ceilings shared by all coordination operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Sentinel policy for short ledger critical sections.
    pub ledger_mutex: MutexPolicy,

    /// Sentinel policy for the configuration file (covers slow engine calls).
    pub config_mutex: MutexPolicy,

    /// Sleep between checks of a named lock or resource; one "minute" tick.
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            ledger_mutex: MutexPolicy::tiered(5),
            config_mutex: MutexPolicy::tiered(20),
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// One job process as seen by the coordination layer.
#[derive(Clone)]
pub struct Participant {
    /// Our own pid, written into every record we create.
    pub pid: u32,

    /// Normalized executable name of this program.
    pub program: String,

    pub processes: Arc<dyn ProcessTable>,
    pub sleeper: Arc<dyn Sleeper>,
    pub timing: Timing,
}

impl Participant {
    pub fn new(
        pid: u32,
        program: impl Into<String>,
        processes: Arc<dyn ProcessTable>,
        sleeper: Arc<dyn Sleeper>,
        timing: Timing,
    ) -> Self {
        Self {
            pid,
            program: program.into(),
            processes,
            sleeper,
            timing,
        }
    }

    /// Probe `pid` against this program's name.
    pub fn liveness(&self, pid: u32) -> Liveness {
        classify(self.processes.as_ref(), pid, &self.program)
    }

    /// Whether `pid` is a running instance of this program.
    pub fn is_live_instance(&self, pid: u32) -> bool {
        self.liveness(pid).is_instance()
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .field("timing", &self.timing)
            .finish()
    }
}
