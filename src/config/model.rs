//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration for rmanrun jobs.
///
/// This struct represents the contents of `<base>/config/rmanrun.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Coordination settings
    // =========================================================================
    /// Poll intervals to wait for a named lock before giving up.
    #[serde(default = "default_check_mins")]
    pub check_lock_mins: u32,

    /// Poll intervals to wait for resources before giving up.
    #[serde(default = "default_check_mins")]
    pub check_resource_mins: u32,

    /// Seconds between two checks of a named lock or resource.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum wait, in seconds, for a ledger sentinel.
    #[serde(default = "default_ledger_wait_secs")]
    pub ledger_wait_secs: u32,

    /// Maximum wait, in seconds, for the configuration file sentinel.
    #[serde(default = "default_config_wait_secs")]
    pub config_wait_secs: u32,

    /// Fixed sentinel polling quantum; replaces the tiered default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutex_quantum_ms: Option<u64>,

    // =========================================================================
    // Log settings
    // =========================================================================
    /// Job logs older than this are removed on start.
    #[serde(default = "default_log_keep_days")]
    pub log_keep_days: u32,

    // =========================================================================
    // Engine settings
    // =========================================================================
    /// Desired engine configuration applied around each job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rman_config: Option<PathBuf>,

    /// Engine program and leading arguments (shell-words parsed; no shell).
    #[serde(default = "default_engine_command")]
    pub engine_command: String,

    #[serde(default = "default_target_connection")]
    pub target_connection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_connection: Option<String>,

    /// Channels substituted for `<parallel>` in scripts.
    #[serde(default = "default_parallel_slaves")]
    pub parallel_slaves: u32,

    #[serde(default = "default_channel_device")]
    pub channel_device: String,

    /// Substituted for `<format>` in scripts.
    #[serde(default)]
    pub file_format: String,

    /// Failure codes that do not fail a run, e.g. `RMAN-08137`.
    #[serde(default)]
    pub ignore_codes: Vec<String>,

    #[serde(default = "default_nls_date_format")]
    pub nls_date_format: String,

    // =========================================================================
    // Per-database overrides
    // =========================================================================
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub databases: BTreeMap<String, DatabaseOverrides>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_lock_mins: default_check_mins(),
            check_resource_mins: default_check_mins(),
            poll_interval_secs: default_poll_interval_secs(),
            ledger_wait_secs: default_ledger_wait_secs(),
            config_wait_secs: default_config_wait_secs(),
            mutex_quantum_ms: None,
            log_keep_days: default_log_keep_days(),
            rman_config: None,
            engine_command: default_engine_command(),
            target_connection: default_target_connection(),
            catalog_connection: None,
            parallel_slaves: default_parallel_slaves(),
            channel_device: default_channel_device(),
            file_format: String::new(),
            ignore_codes: Vec::new(),
            nls_date_format: default_nls_date_format(),
            databases: BTreeMap::new(),
        }
    }
}
