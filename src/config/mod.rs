//! Configuration model for rmanrun.
//!
//! This module defines the Config struct that represents
//! `<base>/config/rmanrun.yaml`. It supports forward-compatible YAML parsing
//! (unknown fields are ignored), defaults for every field, per-database
//! overrides, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use types::DatabaseOverrides;
