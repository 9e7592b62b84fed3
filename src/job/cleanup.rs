//! Run-once cleanup shared by the main flow and the signal listener.

use crate::error::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Latch guaranteeing a cleanup body runs at most once per process.
///
/// A second caller arriving while the body runs blocks until it has
/// finished, then skips it.
#[derive(Debug, Default)]
pub struct CleanupLatch {
    started: Mutex<bool>,
    finished: AtomicBool,
}

impl CleanupLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` unless the latch already ran.
    ///
    /// Returns `None` when skipped.
    pub fn run(&self, body: impl FnOnce() -> Result<()>) -> Option<Result<()>> {
        let mut started = self.started.lock().unwrap_or_else(|p| p.into_inner());
        if *started {
            return None;
        }
        *started = true;

        let result = body();
        self.finished.store(true, Ordering::SeqCst);
        Some(result)
    }

    /// Whether a cleanup body has completed.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}
