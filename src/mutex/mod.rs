//! Mutex primitive for rmanrun.
//!
//! Serializes read-modify-write access to one shared file across processes,
//! using nothing but the filesystem.
//!
//! # Sentinel Files
//!
//! The sentinel for a target path is `<target>.locker`. It holds no data: its
//! existence means "held". It is created with **create_new** semantics
//! (exclusive create), so at most one process can hold it at a time regardless
//! of any in-process state.
//!
//! # Waiting
//!
//! Contention is handled by fixed-quantum polling governed by a
//! [`MutexPolicy`]. Only "already exists" is retried; any other creation
//! failure (missing directory, permissions) is reported immediately.
//!
//! # RAII Guards
//!
//! A held sentinel is represented by a [`MutexGuard`]. Prefer
//! [`with_mutex`], which releases on every exit path and reports release
//! failures: a sentinel left behind blocks every future job.

mod guard;
mod operations;
mod policy;

#[cfg(test)]
mod tests;

pub use guard::{MutexGuard, release_held_by};
pub use operations::{acquire, sentinel_path, with_mutex};
pub use policy::MutexPolicy;
