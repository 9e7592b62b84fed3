//! Tests for config functionality.

use crate::config::{Config, DatabaseOverrides};
use crate::error::CoordError;
use crate::mutex::MutexPolicy;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.check_lock_mins, 5);
    assert_eq!(config.check_resource_mins, 5);
    assert_eq!(config.poll_interval_secs, 60);
    assert_eq!(config.ledger_wait_secs, 5);
    assert_eq!(config.config_wait_secs, 20);
    assert_eq!(config.mutex_quantum_ms, None);
    assert_eq!(config.log_keep_days, 14);
    assert_eq!(config.rman_config, None);
    assert_eq!(config.engine_command, "rman");
    assert_eq!(config.target_connection, "/");
    assert_eq!(config.catalog_connection, None);
    assert_eq!(config.parallel_slaves, 1);
    assert_eq!(config.channel_device, "DISK");
    assert_eq!(config.file_format, "");
    assert!(config.ignore_codes.is_empty());
    assert_eq!(config.nls_date_format, "DD_MON_YYYY HH24:MI:SS");
    assert!(config.databases.is_empty());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
check_lock_mins: 30
catalog_connection: rcat/secret@RCAT
"#;
    let config = Config::from_yaml(yaml).unwrap();

    // Specified values should be used
    assert_eq!(config.check_lock_mins, 30);
    assert_eq!(config.catalog_connection.as_deref(), Some("rcat/secret@RCAT"));

    // Unspecified values should use defaults
    assert_eq!(config.check_resource_mins, 5);
    assert_eq!(config.engine_command, "rman");
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
check_lock_mins: 10
check_resource_mins: 15
poll_interval_secs: 30
ledger_wait_secs: 8
config_wait_secs: 40
mutex_quantum_ms: 250
log_keep_days: 7
rman_config: /u01/rmanrun/config/nightly.cfg
engine_command: "/u01/app/oracle/bin/rman --quiet"
target_connection: sys/secret@PROD
catalog_connection: rcat/secret@RCAT
parallel_slaves: 4
channel_device: SBT_TAPE
file_format: "/backup/%d_%U"
ignore_codes:
  - RMAN-08137
  - ORA-19809
nls_date_format: "YYYY-MM-DD HH24:MI:SS"
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.check_lock_mins, 10);
    assert_eq!(config.check_resource_mins, 15);
    assert_eq!(config.poll_interval_secs, 30);
    assert_eq!(config.ledger_wait_secs, 8);
    assert_eq!(config.config_wait_secs, 40);
    assert_eq!(config.mutex_quantum_ms, Some(250));
    assert_eq!(config.log_keep_days, 7);
    assert_eq!(
        config.rman_config,
        Some(PathBuf::from("/u01/rmanrun/config/nightly.cfg"))
    );
    assert_eq!(
        config.engine_command_words().unwrap(),
        vec!["/u01/app/oracle/bin/rman", "--quiet"]
    );
    assert_eq!(config.parallel_slaves, 4);
    assert_eq!(config.channel_device, "SBT_TAPE");
    assert_eq!(config.file_format, "/backup/%d_%U");
    assert_eq!(config.ignore_codes, vec!["RMAN-08137", "ORA-19809"]);
    assert_eq!(config.nls_date_format, "YYYY-MM-DD HH24:MI:SS");
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
check_lock_mins: 7
email_address: dba@example.com
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.check_lock_mins, 7);
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load(temp_dir.path().join("rmanrun.yaml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rmanrun.yaml");
    std::fs::write(&path, "parallel_slaves: 3\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.parallel_slaves, 3);
}

#[test]
fn test_invalid_yaml_is_user_error() {
    let err = Config::from_yaml("check_lock_mins: [unclosed").unwrap_err();
    assert!(matches!(err, CoordError::UserError(_)));
}

#[test]
fn test_validation_rejects_zero_values() {
    for yaml in [
        "poll_interval_secs: 0",
        "ledger_wait_secs: 0",
        "config_wait_secs: 0",
        "parallel_slaves: 0",
        "mutex_quantum_ms: 0",
    ] {
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(
            err.to_string().contains("must be greater than 0"),
            "{}: {}",
            yaml,
            err
        );
    }
}

#[test]
fn test_validation_rejects_malformed_ignore_codes() {
    let err = Config::from_yaml("ignore_codes: [RMAN-123]").unwrap_err();
    assert!(err.to_string().contains("RMAN-123"));
}

#[test]
fn test_validation_rejects_empty_engine_command() {
    assert!(Config::from_yaml("engine_command: \"\"").is_err());
    assert!(Config::from_yaml("engine_command: \"rman 'unterminated\"").is_err());
}

#[test]
fn test_database_overrides_are_merged() {
    let yaml = r#"
parallel_slaves: 2
channel_device: DISK
databases:
  PROD:
    parallel_slaves: 8
    channel_device: SBT_TAPE
    ignore_codes: [RMAN-08137]
  TEST:
    check_lock_mins: 1
"#;
    let config = Config::from_yaml(yaml).unwrap();

    let prod = config.for_database(Some("PROD"));
    assert_eq!(prod.parallel_slaves, 8);
    assert_eq!(prod.channel_device, "SBT_TAPE");
    assert_eq!(prod.ignore_codes, vec!["RMAN-08137"]);
    assert_eq!(prod.check_lock_mins, 5);

    let test = config.for_database(Some("TEST"));
    assert_eq!(test.parallel_slaves, 2);
    assert_eq!(test.check_lock_mins, 1);

    assert_eq!(config.for_database(Some("DEV")), config);
    assert_eq!(config.for_database(None), config);
}

#[test]
fn test_database_override_validation() {
    let yaml = r#"
databases:
  PROD:
    parallel_slaves: 0
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("databases.PROD.parallel_slaves"));
}

#[test]
fn test_timing_uses_tiered_policy_by_default() {
    let timing = Config::default().timing();

    assert_eq!(timing.ledger_mutex, MutexPolicy::tiered(5));
    assert_eq!(timing.config_mutex, MutexPolicy::tiered(20));
    assert_eq!(timing.poll_interval, Duration::from_secs(60));
}

#[test]
fn test_timing_uses_explicit_quantum() {
    let config = Config {
        mutex_quantum_ms: Some(500),
        ..Config::default()
    };
    let timing = config.timing();

    assert_eq!(timing.ledger_mutex.quantum, Duration::from_millis(500));
    assert_eq!(timing.ledger_mutex.attempts, 10);
    assert_eq!(timing.config_mutex.attempts, 40);
}

#[test]
fn test_yaml_round_trip() {
    let config = Config {
        rman_config: Some(PathBuf::from("/cfg/nightly.cfg")),
        databases: [(
            "PROD".to_string(),
            DatabaseOverrides {
                parallel_slaves: Some(4),
                ..DatabaseOverrides::default()
            },
        )]
        .into_iter()
        .collect(),
        ..Config::default()
    };

    let yaml = config.to_yaml().unwrap();
    assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
}
