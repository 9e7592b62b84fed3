//! RAII guard for a held sentinel.

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

/// Sentinels held by live guards in this process, with the holding thread.
static HELD: Mutex<Vec<(ThreadId, PathBuf)>> = Mutex::new(Vec::new());

fn register(sentinel: &Path) {
    HELD.lock()
        .unwrap_or_else(|p| p.into_inner())
        .push((thread::current().id(), sentinel.to_path_buf()));
}

fn unregister(sentinel: &Path) {
    let mut held = HELD.lock().unwrap_or_else(|p| p.into_inner());
    if let Some(idx) = held.iter().position(|(_, path)| path == sentinel) {
        held.swap_remove(idx);
    }
}

/// Delete every sentinel still held by guards created on `thread`.
///
/// Only for a process about to exit while `thread` is stuck inside a
/// critical section: its guards will never be dropped. Returns the
/// sentinels removed.
pub fn release_held_by(thread: ThreadId) -> Vec<PathBuf> {
    let abandoned: Vec<PathBuf> = {
        let mut held = HELD.lock().unwrap_or_else(|p| p.into_inner());
        let (mine, rest): (Vec<_>, Vec<_>) = held.drain(..).partition(|(owner, _)| *owner == thread);
        *held = rest;
        mine.into_iter().map(|(_, path)| path).collect()
    };

    for sentinel in &abandoned {
        match crate::fs::remove_if_exists(sentinel) {
            Ok(_) => tracing::warn!(sentinel = %sentinel.display(), "removed abandoned mutex"),
            Err(e) => tracing::error!(
                sentinel = %sentinel.display(),
                error = %e,
                "failed to remove abandoned mutex; remove the sentinel by hand"
            ),
        }
    }
    abandoned
}

/// Proof that the sentinel for `target` is held by this process.
///
/// When dropped without an explicit [`release`](MutexGuard::release), the
/// sentinel is still deleted; a failure there is logged because it cannot be
/// returned.
#[derive(Debug)]
pub struct MutexGuard {
    /// The file the sentinel protects.
    target: PathBuf,

    /// The sentinel file itself (`<target>.locker`).
    sentinel: PathBuf,

    released: bool,
}

impl MutexGuard {
    pub(super) fn new(target: PathBuf, sentinel: PathBuf) -> Self {
        register(&sentinel);
        Self {
            target,
            sentinel,
            released: false,
        }
    }

    /// The protected file.
    pub fn target(&self) -> &Path {
        &self.target
    }

    #[cfg(test)]
    pub(crate) fn sentinel(&self) -> &Path {
        &self.sentinel
    }

    /// Release the sentinel.
    ///
    /// An already-absent sentinel counts as released. Any other deletion
    /// failure is fatal to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        unregister(&self.sentinel);
        crate::fs::remove_if_exists(&self.sentinel)?;
        tracing::debug!(sentinel = %self.sentinel.display(), "mutex released");
        Ok(())
    }
}

impl Drop for MutexGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        unregister(&self.sentinel);
        if let Err(e) = crate::fs::remove_if_exists(&self.sentinel) {
            tracing::error!(
                sentinel = %self.sentinel.display(),
                error = %e,
                "failed to release mutex; remove the sentinel by hand"
            );
        }
    }
}
