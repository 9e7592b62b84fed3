//! Termination signal handling.
//!
//! On SIGINT, SIGTERM or SIGHUP the listener cancels every poll sleep,
//! stops the running engine, gives the main flow a grace period to unwind
//! and clean up, then cleans up itself and exits. Sentinels the main flow
//! still holds at that point are deleted before exiting, since its guards
//! never get to drop.

use super::session::JobSession;
use crate::clock::CancelToken;
use crate::engine::ChildSlot;
use crate::error::{CoordError, Result};
use crate::exit_codes;
use crate::mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// How long the main flow gets to clean up after a signal.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

const GRACE_POLL: Duration = Duration::from_millis(100);

/// Everything the listener acts on.
#[derive(Clone)]
pub struct Shutdown {
    pub session: Arc<JobSession>,
    pub cancel: CancelToken,
    pub child: ChildSlot,
    pub grace: Duration,
    /// Thread running the job; its sentinels are abandoned on exit.
    pub owner: ThreadId,
}

impl Shutdown {
    /// React to a termination signal. Returns once cleanup has run.
    pub fn interrupt(&self) {
        warn!("termination signal received - interrupting the job");
        self.cancel.cancel();
        self.child.terminate();

        if !wait_for_cleanup(&self.session, self.grace) {
            warn!(grace = ?self.grace, "job did not clean up in time - cleaning up now");
        }
        if let Err(e) = self.session.cleanup() {
            error!(error = %e, "cleanup after signal failed");
        }
    }

    /// Delete the sentinels the job thread still holds. Called right
    /// before the process exits.
    pub fn abandon_owner_sentinels(&self) -> Vec<PathBuf> {
        mutex::release_held_by(self.owner)
    }
}

/// Install the process-wide signal listener.
///
/// Only the first signal is acted on; the process exits with the
/// cancelled status once cleanup has run.
pub fn install(shutdown: Shutdown) -> Result<()> {
    let fired = AtomicBool::new(false);

    ctrlc::set_handler(move || {
        if fired.swap(true, Ordering::SeqCst) {
            return;
        }
        shutdown.interrupt();
        shutdown.abandon_owner_sentinels();
        std::process::exit(exit_codes::CANCELLED);
    })
    .map_err(|e| CoordError::UserError(format!("failed to install signal handler: {}", e)))
}

/// Wait up to `grace` for the session's cleanup to complete.
pub fn wait_for_cleanup(session: &JobSession, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while !session.is_cleaned_up() {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep((deadline - now).min(GRACE_POLL));
    }
    true
}
