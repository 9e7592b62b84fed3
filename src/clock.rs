//! Sleeping abstraction for testable polling loops.
//!
//! Every wait in the coordination layer suspends by sleeping a fixed quantum
//! and re-checking. The sleep goes through [`Sleeper`] so tests can count
//! polls instead of waiting, and so a termination signal can interrupt a
//! wait that would otherwise last minutes.

use crate::error::{CoordError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Granularity at which a real sleep re-checks for cancellation.
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(200);

/// Something that can suspend the calling thread.
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`, returning `Cancelled` if interrupted.
    fn sleep(&self, duration: Duration) -> Result<()>;
}

/// Shared cancellation flag set by the signal listener.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if the token has been set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CoordError::Cancelled(
                "termination signal received".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Real sleeper backed by `std::thread::sleep`, interruptible via a token.
#[derive(Clone, Debug, Default)]
pub struct ThreadSleeper {
    cancel: CancelToken,
}

impl ThreadSleeper {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(CANCEL_CHECK_SLICE));
        }
    }
}
