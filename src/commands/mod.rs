//! Command implementations for rmanrun.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the setup both commands share: layout resolution,
//! configuration loading and engine construction.

mod run;
mod status;

use crate::cli::{Command, LayoutArgs};
use crate::config::Config;
use crate::context::JobContext;
use crate::engine::{ChildSlot, ErrorScanner, RmanEngine, RmanSettings};
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Status(args) => status::cmd_status(args),
    }
}

/// Resolve the layout and load the effective configuration for `database`.
fn load_context(layout: &LayoutArgs, database: Option<&str>) -> Result<(JobContext, Config)> {
    let ctx = JobContext::resolve(layout.base_dir.as_deref(), layout.log_dir.as_deref())?;
    let config_path = layout.config.clone().unwrap_or_else(|| ctx.config_path());
    let config = Config::load(config_path)?.for_database(database);
    Ok((ctx, config))
}

/// The RMAN engine described by `config`, writing command files to the
/// context's tmp directory.
fn build_engine(ctx: &JobContext, config: &Config, child: ChildSlot) -> Result<RmanEngine> {
    let settings = RmanSettings {
        command: config.engine_command_words()?,
        target_connection: config.target_connection.clone(),
        catalog_connection: config.catalog_connection.clone(),
        nls_date_format: config.nls_date_format.clone(),
        file_format: config.file_format.clone(),
        parallel_slaves: config.parallel_slaves,
        channel_device: config.channel_device.clone(),
        work_dir: ctx.tmp_dir.clone(),
    };
    let scanner = ErrorScanner::new(config.ignore_codes.as_slice())?;
    Ok(RmanEngine::new(settings, scanner, child))
}
