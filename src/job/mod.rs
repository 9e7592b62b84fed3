//! Job lifecycle for rmanrun.
//!
//! A job acquires its coordination in a fixed order (named lock, resources,
//! configuration check), runs its script, and gives everything back in
//! reverse. Cleanup is reachable from two places: the end of the main flow
//! and the signal listener. A latch makes sure it runs once.

mod cleanup;
mod session;
pub mod signals;


pub use cleanup::CleanupLatch;
pub use session::{Coordination, JobRequest, JobSession, WaitLimits};
pub use signals::Shutdown;
