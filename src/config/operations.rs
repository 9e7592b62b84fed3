//! Config loading, validation, and derived settings.

use super::model::Config;
use crate::engine::ErrorScanner;
use crate::error::{CoordError, Result};
use crate::mutex::MutexPolicy;
use crate::participant::Timing;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// A missing file yields the defaults. Unknown fields in the YAML are
    /// silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(CoordError::UserError)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(CoordError::UserError(format!(
                    "failed to read config file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null, not as an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| CoordError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            CoordError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - poll interval, wait ceilings and parallel slaves must be positive
    /// - `mutex_quantum_ms`, when set, must be positive
    /// - `engine_command` must split into at least one word
    /// - `ignore_codes` must look like `RMAN-NNNNN` or `ORA-NNNNN`
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("ledger_wait_secs", u64::from(self.ledger_wait_secs)),
            ("config_wait_secs", u64::from(self.config_wait_secs)),
            ("parallel_slaves", u64::from(self.parallel_slaves)),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CoordError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        if self.mutex_quantum_ms == Some(0) {
            return Err(CoordError::UserError(
                "config validation failed: mutex_quantum_ms must be greater than 0".to_string(),
            ));
        }

        self.engine_command_words()?;

        ErrorScanner::new(self.ignore_codes.as_slice()).map_err(|e| {
            CoordError::UserError(format!("config validation failed: {}", e))
        })?;

        for (database, overrides) in &self.databases {
            if overrides.parallel_slaves == Some(0) {
                return Err(CoordError::UserError(format!(
                    "config validation failed: databases.{}.parallel_slaves must be greater than 0",
                    database
                )));
            }
        }

        Ok(())
    }

    /// The effective config for `database`, with its overrides applied.
    pub fn for_database(&self, database: Option<&str>) -> Self {
        let mut merged = self.clone();
        let Some(overrides) = database.and_then(|db| self.databases.get(db)) else {
            return merged;
        };

        if let Some(v) = overrides.check_lock_mins {
            merged.check_lock_mins = v;
        }
        if let Some(v) = overrides.check_resource_mins {
            merged.check_resource_mins = v;
        }
        if let Some(v) = &overrides.rman_config {
            merged.rman_config = Some(v.clone());
        }
        if let Some(v) = &overrides.engine_command {
            merged.engine_command = v.clone();
        }
        if let Some(v) = &overrides.target_connection {
            merged.target_connection = v.clone();
        }
        if let Some(v) = &overrides.catalog_connection {
            merged.catalog_connection = Some(v.clone());
        }
        if let Some(v) = overrides.parallel_slaves {
            merged.parallel_slaves = v;
        }
        if let Some(v) = &overrides.channel_device {
            merged.channel_device = v.clone();
        }
        if let Some(v) = &overrides.file_format {
            merged.file_format = v.clone();
        }
        if let Some(v) = &overrides.ignore_codes {
            merged.ignore_codes = v.clone();
        }
        if let Some(v) = &overrides.nls_date_format {
            merged.nls_date_format = v.clone();
        }

        merged
    }

    /// Sentinel policies and poll interval derived from this config.
    pub fn timing(&self) -> Timing {
        let policy = |secs: u32| match self.mutex_quantum_ms {
            Some(ms) => MutexPolicy::with_quantum(secs, Duration::from_millis(ms)),
            None => MutexPolicy::tiered(secs),
        };

        Timing {
            ledger_mutex: policy(self.ledger_wait_secs),
            config_mutex: policy(self.config_wait_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    /// `engine_command` split into program and arguments.
    pub fn engine_command_words(&self) -> Result<Vec<String>> {
        let words = shell_words::split(&self.engine_command).map_err(|e| {
            CoordError::UserError(format!(
                "config validation failed: engine_command '{}' is malformed: {}",
                self.engine_command, e
            ))
        })?;

        if words.is_empty() {
            return Err(CoordError::UserError(
                "config validation failed: engine_command must not be empty".to_string(),
            ));
        }
        Ok(words)
    }
}
