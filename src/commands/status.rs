//! Implementation of the `rmanrun status` command.
//!
//! Displays the advisory ledger, resource usage against each ceiling, the
//! obtained ledgers of every job, and the configuration queue. Nothing is
//! locked or modified: the output is a snapshot that may already be stale.

use super::load_context;
use crate::cli::StatusArgs;
use crate::context::JobContext;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::participant::Timing;
use crate::process::{OsProcessTable, ProcessTable, classify};
use crate::reset::ResetProtocol;
use crate::resource::{ResourcePool, load_definitions};
use std::path::Path;

/// Execute the `rmanrun status` command.
pub fn cmd_status(args: StatusArgs) -> Result<()> {
    let (ctx, config) = load_context(&args.layout, None)?;
    let rman_config = args.rman_config.or(config.rman_config);

    let report = render_status(&ctx, rman_config.as_deref(), &OsProcessTable)?;
    print!("{}", report);
    Ok(())
}

/// Build the status report.
fn render_status(
    ctx: &JobContext,
    rman_config: Option<&Path>,
    processes: &dyn ProcessTable,
) -> Result<String> {
    let timing = Timing::default();
    let mut out: Vec<String> = Vec::new();
    let state = |pid: u32| classify(processes, pid, &ctx.program);

    // Named locks
    let locks = Ledger::new(ctx.lock_ledger_path(), timing.ledger_mutex);
    out.push(format!("Named locks ({}):", locks.path().display()));
    let records = locks.records()?;
    if records.is_empty() {
        out.push("  (none)".to_string());
    }
    for record in &records {
        out.push(format!(
            "  {:<20} pid {:<8} {}",
            record.name,
            record.pid,
            state(record.pid)
        ));
    }
    out.push(String::new());

    // Resources
    let pool = ResourcePool::new(ctx.resource_definitions_path(), timing.ledger_mutex);
    out.push(format!("Resources ({}):", pool.definitions_path().display()));
    if pool.definitions_path().exists() {
        let used = pool.usage_by_name()?;
        let definitions = load_definitions(pool.definitions_path())?;
        if definitions.is_empty() {
            out.push("  (none defined)".to_string());
        }
        for definition in &definitions {
            let consumed = used.get(&definition.name).copied().unwrap_or(0);
            out.push(format!(
                "  {:<20} {:>4}/{}",
                definition.name, consumed, definition.max
            ));
        }
        for (name, consumed) in &used {
            if !definitions.iter().any(|d| &d.name == name) {
                out.push(format!("  {:<20} {:>4}/? (not defined)", name, consumed));
            }
        }
    } else {
        out.push("  (no resource file)".to_string());
    }

    let obtained = pool.obtained_ledgers()?;
    if !obtained.is_empty() {
        out.push("  Obtained:".to_string());
    }
    for (pid, path) in &obtained {
        let grants: Vec<String> = pool
            .grants_in(path)?
            .iter()
            .map(|grant| grant.to_line())
            .collect();
        out.push(format!(
            "    pid {:<8} {:<24} {}",
            pid,
            state(*pid).to_string(),
            grants.join(", ")
        ));
    }
    out.push(String::new());

    // Configuration queue
    match rman_config {
        None => out.push("Configuration queue: no RMAN configuration file configured".to_string()),
        Some(path) => {
            let config_file = ctx.engine_config_path(path);
            let queue = Ledger::new(
                ResetProtocol::queue_path_of(&config_file),
                timing.config_mutex,
            );
            out.push(format!("Configuration queue ({}):", queue.path().display()));
            let queue = queue.records()?;
            if queue.is_empty() {
                out.push("  (empty)".to_string());
            }
            for (position, record) in queue.iter().enumerate() {
                let role = if position == 0 { "leader" } else { "follower" };
                let baseline = if ResetProtocol::baseline_path_of(&config_file, record.pid).exists() {
                    "baseline saved"
                } else {
                    "no baseline"
                };
                out.push(format!(
                    "  {:<8} pid {:<8} {:<24} {}",
                    role,
                    record.pid,
                    state(record.pid).to_string(),
                    baseline
                ));
            }
        }
    }

    out.push(String::new());
    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProcessTable;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, JobContext, FakeProcessTable) {
        let temp_dir = TempDir::new().unwrap();
        let ctx = JobContext::resolve_from(temp_dir.path(), "rmanrun", 1);
        fs::create_dir_all(&ctx.config_dir).unwrap();
        let table = FakeProcessTable::new();
        table.spawn(100, "rmanrun");
        table.spawn(300, "/usr/bin/bash");
        (temp_dir, ctx, table)
    }

    #[test]
    fn test_status_of_empty_installation() {
        let (_temp_dir, ctx, table) = setup();

        let report = render_status(&ctx, None, &table).unwrap();

        assert!(report.contains("Named locks"));
        assert!(report.contains("  (none)"));
        assert!(report.contains("(no resource file)"));
        assert!(report.contains("no RMAN configuration file configured"));
    }

    #[test]
    fn test_status_shows_every_ledger() {
        let (_temp_dir, ctx, table) = setup();
        let dir = &ctx.config_dir;
        fs::write(ctx.lock_ledger_path(), "100 nightly\n200 weekly\n").unwrap();
        fs::write(ctx.resource_definitions_path(), "tape:4\n").unwrap();
        fs::write(dir.join("rmanrun.res.used"), "tape:1\ntape:2\n").unwrap();
        fs::write(dir.join("rmanrun.res.obtained.100"), "tape:1\n").unwrap();
        fs::write(dir.join("rmanrun.res.obtained.200"), "tape:2\n").unwrap();
        fs::write(dir.join("nightly.cfg"), "").unwrap();
        fs::write(dir.join("nightly.cfg.lock"), "300 0\n100 0\n").unwrap();
        fs::write(dir.join("nightly.cfg.300.reset"), "").unwrap();

        let report = render_status(&ctx, Some(Path::new("nightly.cfg")), &table).unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert!(lines.iter().any(|l| l.contains("nightly") && l.contains("running")));
        assert!(lines.iter().any(|l| l.contains("weekly") && l.contains("dead")));
        assert!(lines.iter().any(|l| l.contains("tape") && l.contains("3/4")));
        assert!(lines.iter().any(|l| l.contains("pid 200") && l.contains("tape:2")));
        assert!(lines.iter().any(|l| {
            l.contains("leader") && l.contains("foreign") && l.contains("baseline saved")
        }));
        assert!(lines.iter().any(|l| l.contains("follower") && l.contains("no baseline")));
    }

    #[test]
    fn test_status_without_config_directory() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = JobContext::resolve_from(temp_dir.path().join("missing"), "rmanrun", 1);
        let table = FakeProcessTable::new();

        let report = render_status(&ctx, Some(Path::new("nightly.cfg")), &table).unwrap();

        assert!(report.contains("(no resource file)"));
        assert!(!report.contains("Obtained"));
        assert!(report.contains("  (empty)"));
    }

    #[test]
    fn test_status_takes_no_sentinels() {
        let (_temp_dir, ctx, table) = setup();
        fs::write(ctx.lock_ledger_path(), "100 nightly\n").unwrap();

        render_status(&ctx, None, &table).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&ctx.config_dir)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".locker"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
