//! Job history for rmanrun.
//!
//! Every finished job appends one JSON object per line (NDJSON) to
//! `<log_dir>/<program>.history`. Several jobs finish concurrently, so the
//! append happens under the Mutex Primitive for the history file.
//!
//! # Record Format
//!
//! - `ts`: RFC3339 timestamp of completion
//! - `status`: `success`, `failure` or `cancelled`
//! - `program`, `pid`: the job process
//! - `actor`: `user@HOST`
//! - `database`: optional database name
//! - `script`: the script that was run
//! - `elapsed_secs`: wall time of the job
//! - `error`: optional error message

use crate::clock::Sleeper;
use crate::error::{CoordError, Result};
use crate::fs::append_line;
use crate::mutex::{MutexPolicy, with_mutex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failure,
    /// Interrupted by a termination signal.
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failure => write!(f, "failure"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One line of the job history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub ts: DateTime<Utc>,
    pub status: JobStatus,
    pub program: String,
    pub pid: u32,
    pub actor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    pub script: PathBuf,
    pub elapsed_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    /// A record stamped now, with the actor taken from the environment.
    pub fn new(status: JobStatus, program: impl Into<String>, pid: u32, script: &Path) -> Self {
        Self {
            ts: Utc::now(),
            status,
            program: program.into(),
            pid,
            actor: get_actor_string(),
            database: None,
            script: script.to_path_buf(),
            elapsed_secs: 0,
            error: None,
        }
    }

    pub fn with_database(mut self, database: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_secs = elapsed.as_secs();
        self
    }

    pub fn with_error(mut self, error: &CoordError) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Serialize the record to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            CoordError::UserError(format!("failed to serialize history record: {}", e))
        })
    }
}

/// `user@HOST` of the running job.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append `record` to the history file at `path`.
///
/// The parent directory is created if needed. The append is serialized
/// against other jobs by the history file's sentinel.
pub fn append_record(
    path: &Path,
    record: &JobRecord,
    policy: MutexPolicy,
    sleeper: &dyn Sleeper,
) -> Result<()> {
    let line = record.to_ndjson_line()?;

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| {
            CoordError::IoFailure(format!(
                "failed to create history directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }

    with_mutex(path, policy, sleeper, |_| append_line(path, &line))
}
