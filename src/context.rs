//! Filesystem layout resolution for one rmanrun process.
//!
//! The installation is a base directory holding `bin/`, `config/`, `tmp/`
//! and `log/`. By default the base is the parent of the directory holding
//! the executable, so `/u01/rmanrun/bin/rmanrun` runs against
//! `/u01/rmanrun`. Every ledger path other tooling may rely on is derived
//! here and nowhere else.

use crate::error::{CoordError, Result};
use crate::fs::with_suffix;
use crate::process::normalize_image_name;
use std::env;
use std::path::{Path, PathBuf};

/// Fallback program name when the executable path cannot be inspected.
pub const DEFAULT_PROGRAM: &str = "rmanrun";

/// Resolved paths for one job process. All paths are absolute when the
/// base directory is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    /// Installation base directory.
    pub base_dir: PathBuf,

    /// `<base>/config`: configuration, advisory ledger, resource ledgers.
    pub config_dir: PathBuf,

    /// `<base>/tmp`: engine command files.
    pub tmp_dir: PathBuf,

    /// Job logs and history (default `<base>/log`).
    pub log_dir: PathBuf,

    /// Normalized name of this program, the liveness identity of its records.
    pub program: String,

    /// Our own pid.
    pub pid: u32,
}

impl JobContext {
    /// Resolve the layout for the running executable.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Explicit base directory, replacing the executable-derived one
    /// * `log_dir` - Explicit log directory, replacing `<base>/log`
    pub fn resolve(base_dir: Option<&Path>, log_dir: Option<&Path>) -> Result<Self> {
        let exe = env::current_exe().map_err(|e| {
            CoordError::UserError(format!("failed to locate the running executable: {}", e))
        })?;

        let program = exe
            .file_name()
            .map(|name| normalize_image_name(&name.to_string_lossy()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());

        let base_dir = match base_dir {
            Some(dir) => absolute(dir)?,
            None => exe
                .parent()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .ok_or_else(|| {
                    CoordError::UserError(format!(
                        "cannot derive a base directory from '{}'; pass --base-dir",
                        exe.display()
                    ))
                })?,
        };

        let mut ctx = Self::resolve_from(base_dir, program, std::process::id());
        if let Some(dir) = log_dir {
            ctx.log_dir = absolute(dir)?;
        }
        Ok(ctx)
    }

    /// Build the layout under a known base directory.
    pub fn resolve_from(base_dir: impl Into<PathBuf>, program: impl Into<String>, pid: u32) -> Self {
        let base_dir = base_dir.into();
        Self {
            config_dir: base_dir.join("config"),
            tmp_dir: base_dir.join("tmp"),
            log_dir: base_dir.join("log"),
            base_dir,
            program: program.into(),
            pid,
        }
    }

    /// `<config_dir>/<program>.yaml`
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(format!("{}.yaml", self.program))
    }

    /// Advisory lock ledger, `<config_dir>/<program>.lock`.
    pub fn lock_ledger_path(&self) -> PathBuf {
        self.config_dir.join(format!("{}.lock", self.program))
    }

    /// Resource definition ledger, `<config_dir>/<program>.res`.
    ///
    /// The usage and obtained ledgers are derived from it by suffix.
    pub fn resource_definitions_path(&self) -> PathBuf {
        self.config_dir.join(format!("{}.res", self.program))
    }

    /// A desired-settings file named in the configuration. Relative names
    /// are looked up in the config directory.
    pub fn engine_config_path(&self, configured: &Path) -> PathBuf {
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.config_dir.join(configured)
        }
    }

    /// `<log_dir>/<program>[_<database>]_<pid>.log`
    pub fn log_file_name(&self, database: Option<&str>) -> String {
        match database {
            Some(db) => format!("{}_{}_{}.log", self.program, db, self.pid),
            None => format!("{}_{}.log", self.program, self.pid),
        }
    }

    /// `<log_dir>/<program>.history`
    pub fn history_path(&self) -> PathBuf {
        with_suffix(&self.log_dir.join(&self.program), ".history")
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        CoordError::UserError(format!(
            "failed to resolve path '{}': {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> JobContext {
        JobContext::resolve_from("/u01/rmanrun", "rmanrun", 4242)
    }

    #[test]
    fn test_layout_under_base() {
        let ctx = ctx();

        assert_eq!(ctx.config_dir, PathBuf::from("/u01/rmanrun/config"));
        assert_eq!(ctx.tmp_dir, PathBuf::from("/u01/rmanrun/tmp"));
        assert_eq!(ctx.log_dir, PathBuf::from("/u01/rmanrun/log"));
    }

    #[test]
    fn test_ledger_paths() {
        let ctx = ctx();

        assert_eq!(
            ctx.config_path(),
            PathBuf::from("/u01/rmanrun/config/rmanrun.yaml")
        );
        assert_eq!(
            ctx.lock_ledger_path(),
            PathBuf::from("/u01/rmanrun/config/rmanrun.lock")
        );
        assert_eq!(
            ctx.resource_definitions_path(),
            PathBuf::from("/u01/rmanrun/config/rmanrun.res")
        );
        assert_eq!(
            ctx.history_path(),
            PathBuf::from("/u01/rmanrun/log/rmanrun.history")
        );
    }

    #[test]
    fn test_log_file_name() {
        let ctx = ctx();

        assert_eq!(ctx.log_file_name(None), "rmanrun_4242.log");
        assert_eq!(ctx.log_file_name(Some("PROD")), "rmanrun_PROD_4242.log");
    }

    #[test]
    fn test_engine_config_path() {
        let ctx = ctx();

        assert_eq!(
            ctx.engine_config_path(Path::new("nightly.cfg")),
            PathBuf::from("/u01/rmanrun/config/nightly.cfg")
        );
        assert_eq!(
            ctx.engine_config_path(Path::new("/etc/rman/nightly.cfg")),
            PathBuf::from("/etc/rman/nightly.cfg")
        );
    }

    #[test]
    fn test_resolve_with_explicit_dirs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let logs = temp_dir.path().join("logs");

        let ctx = JobContext::resolve(Some(temp_dir.path()), Some(logs.as_path())).unwrap();

        assert_eq!(ctx.base_dir, temp_dir.path());
        assert_eq!(ctx.log_dir, logs);
        assert_eq!(ctx.pid, std::process::id());
        assert!(!ctx.program.is_empty());
    }
}
