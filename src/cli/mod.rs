//! CLI argument parsing for rmanrun.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Characters accepted between `name=amount` pairs of a resource list.
const RESOURCE_SEPARATORS: [char; 4] = ['.', ',', ';', ':'];

/// rmanrun: unattended RMAN backup jobs with file-based coordination.
///
/// Concurrent jobs on one host coordinate through plain files:
/// - named locks keep two jobs from running the same work
/// - resource quotas cap shared capacity such as tape drives
/// - the RMAN configuration is restored once the last job finishes
#[derive(Parser, Debug)]
#[command(name = "rmanrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for rmanrun.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an RMAN script as a coordinated job.
    ///
    /// Takes the named lock, allocates resources and applies the desired
    /// RMAN configuration before the script, and gives everything back
    /// afterwards, including on failure or termination.
    Run(RunArgs),

    /// Show locks, resource usage and the configuration queue.
    ///
    /// Read-only: takes no sentinels.
    Status(StatusArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// RMAN script to run.
    pub script: PathBuf,

    /// Database the script runs against; selects per-database settings.
    #[arg(short, long)]
    pub database: Option<String>,

    /// Named lock held for the duration of the job.
    #[arg(short, long = "lock")]
    pub lock: Option<String>,

    /// Resources to allocate, e.g. `tape=2,slaves=4`.
    #[arg(short, long = "resources", value_parser = parse_resource_list)]
    pub resources: Option<BTreeMap<String, u32>>,

    /// Desired RMAN configuration file, replacing `rman_config`.
    #[arg(short = 'c', long = "rman-config")]
    pub rman_config: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Desired RMAN configuration file whose queue to show, replacing
    /// `rman_config`.
    #[arg(short = 'c', long = "rman-config")]
    pub rman_config: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

/// Overrides of the installation layout.
#[derive(Parser, Debug, Default)]
pub struct LayoutArgs {
    /// Installation base directory (default: parent of the binary's directory).
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Configuration file (default: `<base>/config/rmanrun.yaml`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for job logs and history (default: `<base>/log`).
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Parse `name=amount` pairs separated by one of `.`, `,`, `;` or `:`.
///
/// The separator is whichever of those characters appears first; mixing
/// separators in one list is rejected as a malformed pair.
pub fn parse_resource_list(value: &str) -> Result<BTreeMap<String, u32>, String> {
    let value = value.trim();
    let separator = value.chars().find(|c| RESOURCE_SEPARATORS.contains(c));

    let pairs: Vec<&str> = match separator {
        Some(sep) => value.split(sep).collect(),
        None => vec![value],
    };

    let mut resources = BTreeMap::new();
    for pair in pairs.into_iter().map(str::trim).filter(|p| !p.is_empty()) {
        let (name, amount) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=amount, got '{}'", pair))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing resource name in '{}'", pair));
        }
        let amount: u32 = amount
            .trim()
            .parse()
            .map_err(|_| format!("invalid amount in '{}'", pair))?;

        if resources.insert(name.to_string(), amount).is_some() {
            return Err(format!("resource '{}' requested twice", name));
        }
    }

    if resources.is_empty() {
        return Err("no resources given".to_string());
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn map(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(n, a)| (n.to_string(), *a)).collect()
    }

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_minimal() {
        let cli = Cli::try_parse_from(["rmanrun", "run", "full.rcv"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.script, PathBuf::from("full.rcv"));
            assert!(args.database.is_none());
            assert!(args.lock.is_none());
            assert!(args.resources.is_none());
            assert!(args.layout.base_dir.is_none());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_full() {
        let cli = Cli::try_parse_from([
            "rmanrun",
            "run",
            "full.rcv",
            "-d",
            "PROD",
            "-l",
            "nightly",
            "-r",
            "tape=2,slaves=4",
            "--rman-config",
            "nightly.cfg",
            "--base-dir",
            "/u01/rmanrun",
            "--config",
            "/etc/rmanrun.yaml",
            "--log-dir",
            "/var/log/rmanrun",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.database.as_deref(), Some("PROD"));
            assert_eq!(args.lock.as_deref(), Some("nightly"));
            assert_eq!(args.resources, Some(map(&[("slaves", 4), ("tape", 2)])));
            assert_eq!(args.rman_config, Some(PathBuf::from("nightly.cfg")));
            assert_eq!(args.layout.base_dir, Some(PathBuf::from("/u01/rmanrun")));
            assert_eq!(args.layout.config, Some(PathBuf::from("/etc/rmanrun.yaml")));
            assert_eq!(args.layout.log_dir, Some(PathBuf::from("/var/log/rmanrun")));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_requires_script() {
        assert!(Cli::try_parse_from(["rmanrun", "run"]).is_err());
    }

    #[test]
    fn parse_status() {
        let cli = Cli::try_parse_from(["rmanrun", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn resource_list_accepts_every_separator() {
        for list in [
            "tape=2.slaves=4",
            "tape=2,slaves=4",
            "tape=2;slaves=4",
            "tape=2:slaves=4",
            " tape = 2 , slaves = 4 ",
        ] {
            assert_eq!(
                parse_resource_list(list).unwrap(),
                map(&[("tape", 2), ("slaves", 4)]),
                "{}",
                list
            );
        }
    }

    #[test]
    fn resource_list_single_pair() {
        assert_eq!(parse_resource_list("tape=1").unwrap(), map(&[("tape", 1)]));
    }

    #[test]
    fn resource_list_rejects_malformed_pairs() {
        assert!(parse_resource_list("tape").is_err());
        assert!(parse_resource_list("tape=two").is_err());
        assert!(parse_resource_list("=2").is_err());
        assert!(parse_resource_list("tape=1,tape=2").is_err());
        assert!(parse_resource_list("tape=1,slaves=2;disk=3").is_err());
        assert!(parse_resource_list("").is_err());
    }

    #[test]
    fn parse_run_rejects_bad_resource_list() {
        let result = Cli::try_parse_from(["rmanrun", "run", "full.rcv", "-r", "tape"]);
        assert!(result.is_err());
    }
}
