//! One backup job from first lock to last release.

use super::cleanup::CleanupLatch;
use crate::clock::{CancelToken, Sleeper, ThreadSleeper};
use crate::engine::Engine;
use crate::error::{CoordError, Result};
use crate::ledger::Ledger;
use crate::participant::Participant;
use crate::reset::{ResetOutcome, ResetProtocol};
use crate::resource::ResourcePool;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What the job was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRequest {
    pub script: PathBuf,
    pub database: Option<String>,

    /// Named lock held for the whole job.
    pub lock_name: Option<String>,

    /// Units per resource, allocated in name order.
    pub resources: BTreeMap<String, u32>,
}

/// Poll intervals a job waits before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitLimits {
    pub lock_ticks: u32,
    pub resource_ticks: u32,
}

/// The ledgers a job coordinates through.
#[derive(Debug)]
pub struct Coordination {
    pub locks: Ledger,
    pub resources: ResourcePool,

    /// Present when a desired engine configuration is configured.
    pub reset: Option<ResetProtocol>,
}

/// A running job.
///
/// `run` drives the lifecycle: named lock, resources, configuration check,
/// script, configuration reset. Cleanup is latched, so the signal listener
/// may call [`JobSession::cleanup`] concurrently with the main flow.
pub struct JobSession {
    participant: Participant,
    request: JobRequest,
    limits: WaitLimits,
    coordination: Coordination,
    engine: Arc<dyn Engine>,
    cancel: CancelToken,
    cleanup_sleeper: Arc<dyn Sleeper>,
    latch: CleanupLatch,
}

impl JobSession {
    pub fn new(
        participant: Participant,
        request: JobRequest,
        limits: WaitLimits,
        coordination: Coordination,
        engine: Arc<dyn Engine>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            participant,
            request,
            limits,
            coordination,
            engine,
            cancel,
            cleanup_sleeper: Arc::new(ThreadSleeper::default()),
            latch: CleanupLatch::new(),
        }
    }

    /// Sleeper used while cleaning up.
    ///
    /// It must not share the cancelled token, or cleanup would give up on
    /// the first contended sentinel.
    pub fn with_cleanup_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.cleanup_sleeper = sleeper;
        self
    }

    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    /// Run the job and clean up, whatever happened.
    ///
    /// The job's own error wins over a cleanup error. Any failure observed
    /// after a termination signal is reported as `Cancelled`.
    pub fn run(&self) -> Result<()> {
        let result = self.execute();
        if let Err(e) = &result {
            error!(error = %e, "job failed");
        }

        let cleaned = self.cleanup();
        let result = match (result, cleaned) {
            (Ok(()), cleaned) => cleaned,
            (Err(e), _) => Err(e),
        };

        match result {
            Err(e) if self.cancel.is_cancelled() && !matches!(e, CoordError::Cancelled(_)) => {
                Err(CoordError::Cancelled(format!("job interrupted: {}", e)))
            }
            other => other,
        }
    }

    fn execute(&self) -> Result<()> {
        let p = &self.participant;
        self.cancel.check()?;

        if let Some(name) = &self.request.lock_name {
            self.coordination
                .locks
                .acquire_named(p, name, self.limits.lock_ticks)?;
        }

        if !self.request.resources.is_empty() {
            self.coordination.resources.allocate_all(
                p,
                &self.request.resources,
                self.limits.resource_ticks,
            )?;
        }

        if let Some(reset) = &self.coordination.reset {
            reset.check_config(p)?;
        }

        self.cancel.check()?;
        info!(script = %self.request.script.display(), "running script");
        self.engine.run_script(&self.request.script)?;
        info!(script = %self.request.script.display(), "script completed");

        if let Some(reset) = &self.coordination.reset {
            let outcome = reset.reset_config(p)?;
            log_outcome(&outcome);
        }

        Ok(())
    }

    /// Release everything the job may hold. Runs at most once; later calls
    /// return `Ok(())`.
    ///
    /// Each step is attempted even when an earlier one failed; the first
    /// error is returned.
    pub fn cleanup(&self) -> Result<()> {
        self.latch.run(|| self.release_all()).unwrap_or(Ok(()))
    }

    /// Whether cleanup has completed.
    pub fn is_cleaned_up(&self) -> bool {
        self.latch.is_finished()
    }

    fn release_all(&self) -> Result<()> {
        let mut p = self.participant.clone();
        p.sleeper = self.cleanup_sleeper.clone();

        let mut first_error: Option<CoordError> = None;
        let mut record = |step: &str, result: Result<()>| {
            if let Err(e) = result {
                error!(step, error = %e, "cleanup step failed");
                first_error.get_or_insert(e);
            }
        };

        if let Some(reset) = &self.coordination.reset
            && reset.is_entered()
        {
            warn!("configuration was not reset - resetting during cleanup");
            record(
                "reset configuration",
                reset.reset_config(&p).map(|outcome| log_outcome(&outcome)),
            );
        }

        if !self.request.resources.is_empty() {
            record(
                "release resources",
                self.coordination.resources.release_own(&p).map(drop),
            );
        }

        if self.request.lock_name.is_some() {
            record(
                "release named lock",
                self.coordination.locks.release_named(&p, p.pid).map(drop),
            );
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("cleanup complete");
                Ok(())
            }
        }
    }
}

fn log_outcome(outcome: &ResetOutcome) {
    match outcome {
        ResetOutcome::NotEntered => {}
        ResetOutcome::Restored => info!("configuration restored"),
        ResetOutcome::AdoptedLeader(pid) => {
            info!(leader = pid, "configuration restored from a dead job's baseline")
        }
        ResetOutcome::LeftToLeader(pid) => {
            info!(leader = pid, "another job will restore the configuration")
        }
        ResetOutcome::Deferred(pid) => {
            warn!(leader = pid, "leader is gone but other jobs still run - restore deferred")
        }
        ResetOutcome::HeldForSurvivors => {
            info!("other jobs still use the configuration - keeping the baseline")
        }
    }
}

impl std::fmt::Debug for JobSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSession")
            .field("participant", &self.participant)
            .field("request", &self.request)
            .field("limits", &self.limits)
            .field("coordination", &self.coordination)
            .finish()
    }
}
