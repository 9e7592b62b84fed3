//! Configuration snapshot and reset protocol.
//!
//! Several jobs may share one desired engine configuration file. The first
//! job to start snapshots the engine's configuration (the *baseline*) and
//! applies the desired settings; the last job to finish restores the
//! baseline. Jobs are counted in a queue ledger next to the configuration
//! file:
//!
//! - `<config>.lock`: one `<pid> 0` record per job, in start order.
//! - `<config>.<pid>.reset`: the configuration each job saw when it started.
//!
//! Position 0 of the queue holds the authoritative baseline. If that job dies
//! before restoring, responsibility passes to the survivor that finds the
//! queue shrunk to exactly the dead leader and itself.
//!
//! Every queue and baseline change happens under the sentinel of the
//! configuration file itself.

mod baseline;
mod protocol;


pub use baseline::{configured_lines, desired_settings, missing_from};
pub use protocol::{QUEUE_NAME, ResetOutcome, ResetProtocol};
