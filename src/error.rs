//! Error types for rmanrun.
//!
//! Uses thiserror for derive macros. Every coordination failure is surfaced to
//! the caller; the only condition that is silently retried is "not available
//! yet", which is not an error at all.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for rmanrun operations.
#[derive(Error, Debug)]
pub enum CoordError {
    /// Invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// A named lock or a mutex sentinel was not obtained within its ceiling.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// The requested amount exceeds the configured ceiling of a resource.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A ledger invariant is violated (negative free capacity, foreign sole
    /// survivor, unparseable record). Never repaired automatically.
    #[error("Ledger corruption: {0}")]
    LedgerCorruption(String),

    /// A ledger, sentinel or snapshot could not be read or written.
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// The external backup engine failed.
    #[error("Engine failure: {0}")]
    EngineError(String),

    /// A termination signal interrupted a wait.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl CoordError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoordError::UserError(_) => exit_codes::USER_ERROR,
            CoordError::LockTimeout(_) => exit_codes::LOCK_TIMEOUT,
            CoordError::ResourceExhausted(_) => exit_codes::RESOURCE_EXHAUSTED,
            CoordError::LedgerCorruption(_) => exit_codes::LEDGER_CORRUPTION,
            CoordError::IoFailure(_) => exit_codes::IO_FAILURE,
            CoordError::EngineError(_) => exit_codes::ENGINE_FAILURE,
            CoordError::Cancelled(_) => exit_codes::CANCELLED,
        }
    }

    /// Short label used in the job history.
    pub fn kind(&self) -> &'static str {
        match self {
            CoordError::UserError(_) => "user_error",
            CoordError::LockTimeout(_) => "lock_timeout",
            CoordError::ResourceExhausted(_) => "resource_exhausted",
            CoordError::LedgerCorruption(_) => "ledger_corruption",
            CoordError::IoFailure(_) => "io_failure",
            CoordError::EngineError(_) => "engine_error",
            CoordError::Cancelled(_) => "cancelled",
        }
    }
}

/// Result type alias for rmanrun operations.
pub type Result<T> = std::result::Result<T, CoordError>;
