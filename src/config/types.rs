//! Per-database overrides and default values for rmanrun configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings a single database may override.
///
/// Every field is optional; an absent field keeps the top-level value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_lock_mins: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_resource_mins: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rman_config: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_connection: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_connection: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_slaves: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_device: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_codes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nls_date_format: Option<String>,
}

// Default value functions for serde
pub(crate) fn default_check_mins() -> u32 {
    5
}
pub(crate) fn default_poll_interval_secs() -> u64 {
    60
}
pub(crate) fn default_ledger_wait_secs() -> u32 {
    5
}
pub(crate) fn default_config_wait_secs() -> u32 {
    20
}
pub(crate) fn default_log_keep_days() -> u32 {
    14
}
pub(crate) fn default_engine_command() -> String {
    "rman".to_string()
}
pub(crate) fn default_target_connection() -> String {
    "/".to_string()
}
pub(crate) fn default_parallel_slaves() -> u32 {
    1
}
pub(crate) fn default_channel_device() -> String {
    "DISK".to_string()
}
pub(crate) fn default_nls_date_format() -> String {
    "DD_MON_YYYY HH24:MI:SS".to_string()
}
