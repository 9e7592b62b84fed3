//! Implementation of the `rmanrun run` command.

use super::{build_engine, load_context};
use crate::cli::RunArgs;
use crate::clock::{CancelToken, Sleeper, ThreadSleeper};
use crate::engine::{ChildSlot, Engine};
use crate::error::{CoordError, Result};
use crate::history::{self, JobRecord, JobStatus};
use crate::job::signals::{self, DEFAULT_GRACE};
use crate::job::{Coordination, JobRequest, JobSession, Shutdown, WaitLimits};
use crate::ledger::Ledger;
use crate::logging;
use crate::participant::Participant;
use crate::process::{OsProcessTable, ProcessTable};
use crate::reset::ResetProtocol;
use crate::resource::ResourcePool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Execute the `rmanrun run` command.
///
/// Sets up logging for this job, runs the job lifecycle under a signal
/// listener, and appends the outcome to the job history.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let started = Instant::now();
    let database = args.database.as_deref();
    let (ctx, config) = load_context(&args.layout, database)?;

    let _log_guard = logging::init(&ctx.log_dir, &ctx.log_file_name(database))?;
    info!(
        pid = ctx.pid,
        script = %args.script.display(),
        database = database.unwrap_or("-"),
        base = %ctx.base_dir.display(),
        "starting job"
    );
    match logging::prune_logs(&ctx.log_dir, &ctx.program, config.log_keep_days) {
        Ok(removed) if !removed.is_empty() => info!(removed = removed.len(), "pruned old job logs"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "failed to prune old job logs"),
    }

    let timing = config.timing();
    let cancel = CancelToken::new();
    let child = ChildSlot::new();
    let engine: Arc<dyn Engine> = Arc::new(build_engine(&ctx, &config, child.clone())?);

    let processes: Arc<dyn ProcessTable> = Arc::new(OsProcessTable);
    let sleeper: Arc<dyn Sleeper> = Arc::new(ThreadSleeper::new(cancel.clone()));
    let participant = Participant::new(ctx.pid, ctx.program.clone(), processes, sleeper, timing);

    let rman_config = args.rman_config.clone().or_else(|| config.rman_config.clone());
    let coordination = Coordination {
        locks: Ledger::new(ctx.lock_ledger_path(), timing.ledger_mutex),
        resources: ResourcePool::new(ctx.resource_definitions_path(), timing.ledger_mutex),
        reset: rman_config.map(|path| {
            ResetProtocol::new(
                ctx.engine_config_path(&path),
                engine.clone(),
                timing.config_mutex,
            )
        }),
    };

    let request = JobRequest {
        script: args.script.clone(),
        database: args.database.clone(),
        lock_name: args.lock.clone(),
        resources: args.resources.clone().unwrap_or_default(),
    };
    let limits = WaitLimits {
        lock_ticks: config.check_lock_mins,
        resource_ticks: config.check_resource_mins,
    };

    let session = Arc::new(JobSession::new(
        participant,
        request,
        limits,
        coordination,
        engine,
        cancel.clone(),
    ));
    signals::install(Shutdown {
        session: session.clone(),
        cancel,
        child,
        grace: DEFAULT_GRACE,
        owner: std::thread::current().id(),
    })?;

    let result = session.run();

    let status = match &result {
        Ok(()) => JobStatus::Success,
        Err(CoordError::Cancelled(_)) => JobStatus::Cancelled,
        Err(_) => JobStatus::Failure,
    };
    let mut record = JobRecord::new(status, ctx.program.clone(), ctx.pid, &args.script)
        .with_database(database)
        .with_elapsed(started.elapsed());
    if let Err(e) = &result {
        record = record.with_error(e);
    }
    if let Err(e) = history::append_record(
        &ctx.history_path(),
        &record,
        timing.ledger_mutex,
        &ThreadSleeper::default(),
    ) {
        warn!(error = %e, "failed to record job history");
    }

    match &result {
        Ok(()) => info!(elapsed = ?started.elapsed(), "job completed"),
        Err(e) => info!(elapsed = ?started.elapsed(), kind = e.kind(), "job ended with an error"),
    }
    result
}
