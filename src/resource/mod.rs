//! Resource quota ledger.
//!
//! Finite named resources (tape drives, parallel slave slots) are shared by
//! every job on the host. Three files describe them, all derived from one
//! base path:
//!
//! - `<base>`: read-only definitions, one `name:max` ceiling per line.
//! - `<base>.used`: shared usage ledger, one `name:amount` line per grant.
//!   The sum of amounts for a name is its consumed capacity.
//! - `<base>.obtained.<pid>`: private manifest of every grant one process
//!   wrote to the usage ledger. It is what that process returns on cleanup,
//!   and what another process releases on its behalf if it died first.
//!
//! A request may be satisfied by several partial grants spread over time, so
//! grants are kept as discrete lines and released one matching line at a
//! time rather than aggregated.

mod definition;
mod pool;
mod usage;


pub use definition::{ResourceDefinition, load_definitions};
pub use pool::ResourcePool;
pub use usage::{UsageRecord, consumed};
