//! Sentinel acquisition and scoped critical sections.

use super::guard::MutexGuard;
use super::policy::MutexPolicy;
use crate::clock::Sleeper;
use crate::error::{CoordError, Result};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Sentinel path for `target`: the target path with `.locker` appended.
pub fn sentinel_path(target: &Path) -> PathBuf {
    crate::fs::with_suffix(target, ".locker")
}

/// Acquire the sentinel for `target`, polling according to `policy`.
///
/// # Returns
///
/// * `Ok(MutexGuard)` - The sentinel was created by this call
/// * `Err(CoordError::LockTimeout)` - Still held by someone else after the last attempt
/// * `Err(CoordError::IoFailure)` - Creation failed for a reason other than contention
/// * `Err(CoordError::Cancelled)` - A termination signal interrupted the wait
pub fn acquire(target: &Path, policy: MutexPolicy, sleeper: &dyn Sleeper) -> Result<MutexGuard> {
    let sentinel = sentinel_path(target);
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&sentinel)
        {
            Ok(_) => {
                debug!(sentinel = %sentinel.display(), attempt, "mutex acquired");
                return Ok(MutexGuard::new(target.to_path_buf(), sentinel));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(sentinel = %sentinel.display(), attempt, attempts, "mutex busy");
                if attempt < attempts {
                    sleeper.sleep(policy.quantum)?;
                }
            }
            Err(e) => {
                return Err(CoordError::IoFailure(format!(
                    "failed to create mutex '{}': {}",
                    sentinel.display(),
                    e
                )));
            }
        }
    }

    error!(sentinel = %sentinel.display(), attempts, waited = ?policy.max_wait(), "unable to obtain mutex");
    Err(CoordError::LockTimeout(format!(
        "mutex '{}' still held after {} attempts",
        sentinel.display(),
        attempts
    )))
}

/// Run `body` while holding the sentinel for `target`.
///
/// The sentinel is released on every exit path before the result is
/// returned. If both the body and the release fail, the body's error wins and
/// the release error is logged.
pub fn with_mutex<T>(
    target: &Path,
    policy: MutexPolicy,
    sleeper: &dyn Sleeper,
    body: impl FnOnce(&MutexGuard) -> Result<T>,
) -> Result<T> {
    let guard = acquire(target, policy, sleeper)?;
    let result = body(&guard);
    let released = guard.release();

    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            error!(error = %release_err, "mutex release failed after an earlier error");
            Err(err)
        }
    }
}
