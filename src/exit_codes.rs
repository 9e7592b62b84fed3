//! Exit code constants for the rmanrun CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid configuration)
//! - 2: Lock timeout (named lock or mutex sentinel contention)
//! - 3: Resource exhausted (request exceeds configured ceiling)
//! - 4: Ledger corruption (coordination invariant violated)
//! - 5: I/O failure on a ledger or sentinel
//! - 6: Backup engine failure
//! - 7: Cancelled by a termination signal

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// A lock or sentinel could not be obtained before the wait ceiling.
pub const LOCK_TIMEOUT: i32 = 2;

/// A resource request exceeds the configured capacity.
pub const RESOURCE_EXHAUSTED: i32 = 3;

/// A ledger invariant was violated.
pub const LEDGER_CORRUPTION: i32 = 4;

/// A ledger, sentinel or snapshot file could not be read or written.
pub const IO_FAILURE: i32 = 5;

/// The external backup engine failed or reported errors.
pub const ENGINE_FAILURE: i32 = 6;

/// The job was interrupted by a termination signal.
pub const CANCELLED: i32 = 7;
