//! Text ledgers of `<pid> <name>` records.
//!
//! A ledger is an append/filter-mutated text file, one [`LockRecord`] per
//! line, in insertion order. Two ledgers are built on this module:
//!
//! - The **advisory lock ledger**: named, cooperative mutual exclusion between
//!   job runs. At most one live record per lock name; records left behind by
//!   crashed processes are reaped on the next acquisition.
//! - The **configuration queue ledger** used by [`crate::reset`]: every record
//!   has the name `0`, and line order is the order jobs started using a
//!   configuration file.
//!
//! # Guard Target
//!
//! Every mutation happens while the mutex sentinel of the ledger's *guard
//! target* is held. For the advisory ledger that is the ledger itself; for the
//! queue ledger it is the configuration file, so that queue and snapshot
//! changes share a single sentinel.
//!
//! # Ordering
//!
//! Writers never reorder lines: appends go to the end, removals filter.

mod advisory;
mod record;
mod store;


pub use record::LockRecord;
pub use store::Ledger;
