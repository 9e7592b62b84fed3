//! Logging setup for rmanrun.
//!
//! Diagnostics go to stderr and to a per-job log file. The filter comes from
//! `RUST_LOG` and defaults to `info`. Old job logs are pruned on start.

use crate::error::{CoordError, Result};
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Install the global subscriber writing to stderr and `<log_dir>/<file_name>`.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the duration of `main`.
pub fn init(log_dir: &Path, file_name: &str) -> Result<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all(log_dir).map_err(|e| {
        CoordError::IoFailure(format!(
            "failed to create log directory '{}': {}",
            log_dir.display(),
            e
        ))
    })?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| CoordError::UserError(format!("failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// Remove `<program>_*.log` files in `log_dir` last modified more than
/// `keep_days` days ago. Returns the removed paths.
///
/// Failures to inspect or remove a single file are warnings.
pub fn prune_logs(log_dir: &Path, program: &str, keep_days: u32) -> Result<Vec<PathBuf>> {
    let matcher = Glob::new(&format!("{}_*.log", globset::escape(program)))
        .map_err(|e| CoordError::UserError(format!("invalid log file pattern: {}", e)))?
        .compile_matcher();
    let max_age = Duration::from_secs(u64::from(keep_days) * SECS_PER_DAY);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CoordError::IoFailure(format!(
                "failed to read log directory '{}': {}",
                log_dir.display(),
                e
            )));
        }
    };

    let now = SystemTime::now();
    let mut removed = Vec::new();

    for entry in entries.flatten() {
        if !matcher.is_match(entry.file_name()) {
            continue;
        }
        let path = entry.path();

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| now.duration_since(modified).unwrap_or_default());
        match age {
            Ok(age) if age > max_age => match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed old job log");
                    removed.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove old job log"),
            },
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to inspect job log"),
        }
    }

    removed.sort();
    Ok(removed)
}
