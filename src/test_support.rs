//! Shared fakes for simulating several job processes inside one test.
//!
//! A simulated process is a [`Participant`] with its own pid. Participants
//! built from the same [`FakeProcessTable`] see each other as running
//! instances until the test kills one of them.

use crate::clock::Sleeper;
use crate::engine::Engine;
use crate::error::{CoordError, Result};
use crate::mutex::MutexPolicy;
use crate::participant::{Participant, Timing};
use crate::process::ProcessTable;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const PROGRAM: &str = "rmanrun";

/// In-memory process table.
#[derive(Default)]
pub(crate) struct FakeProcessTable {
    procs: Mutex<HashMap<u32, String>>,
}

impl FakeProcessTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn spawn(&self, pid: u32, image: &str) {
        self.procs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(pid, image.to_string());
    }

    pub(crate) fn kill(&self, pid: u32) {
        self.procs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&pid);
    }
}

impl ProcessTable for FakeProcessTable {
    fn lookup(&self, pid: u32) -> Option<String> {
        self.procs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&pid)
            .cloned()
    }
}

type SleepHook = Box<dyn FnMut(usize) + Send>;

/// Sleeper that returns immediately and records every requested sleep.
///
/// An optional hook runs on each sleep with the 1-based sleep count, which
/// lets a test make "other processes" act while this one is waiting.
#[derive(Default)]
pub(crate) struct FakeSleeper {
    sleeps: Mutex<Vec<Duration>>,
    hook: Mutex<Option<SleepHook>>,
}

impl FakeSleeper {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_hook(hook: impl FnMut(usize) + Send + 'static) -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            hook: Mutex::new(Some(Box::new(hook))),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.sleeps.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Number of sleeps of exactly `duration`.
    pub(crate) fn count_of(&self, duration: Duration) -> usize {
        self.sleeps
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|d| **d == duration)
            .count()
    }
}

impl Sleeper for FakeSleeper {
    fn sleep(&self, duration: Duration) -> Result<()> {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap_or_else(|p| p.into_inner());
            sleeps.push(duration);
            sleeps.len()
        };
        if let Some(hook) = self.hook.lock().unwrap_or_else(|p| p.into_inner()).as_mut() {
            hook(count);
        }
        Ok(())
    }
}

/// Timing used by simulated participants: tiny sentinel waits, one-minute polls.
pub(crate) fn test_timing() -> Timing {
    Timing {
        ledger_mutex: MutexPolicy::new(Duration::from_millis(1), 3),
        config_mutex: MutexPolicy::new(Duration::from_millis(1), 3),
        poll_interval: Duration::from_secs(60),
    }
}

/// Build a simulated running process with `pid`.
pub(crate) fn participant(
    pid: u32,
    table: &Arc<FakeProcessTable>,
    sleeper: &Arc<FakeSleeper>,
) -> Participant {
    table.spawn(pid, PROGRAM);
    let processes: Arc<dyn ProcessTable> = table.clone();
    let sleeper: Arc<dyn Sleeper> = sleeper.clone();
    Participant::new(pid, PROGRAM, processes, sleeper, test_timing())
}

/// Engine whose configuration is an in-memory map of settings.
///
/// A setting line `CONFIGURE <key> TO <value>;` is keyed by the text before
/// ` TO `; other lines are keyed by everything but their last word, so
/// `CONFIGURE CONTROLFILE AUTOBACKUP ON;` and `...OFF;` replace each other.
#[derive(Default)]
pub(crate) struct FakeEngine {
    settings: Mutex<BTreeMap<String, String>>,
    applied: Mutex<Vec<Vec<String>>>,
    scripts: Mutex<Vec<PathBuf>>,
    fail_scripts: bool,
}

impl FakeEngine {
    pub(crate) fn with_settings(lines: &[&str]) -> Self {
        let engine = Self::default();
        engine.set(lines);
        engine
    }

    /// Every `run_script` call fails with an engine error.
    pub(crate) fn failing_scripts(mut self) -> Self {
        self.fail_scripts = true;
        self
    }

    fn set(&self, lines: &[&str]) {
        let mut settings = self.settings.lock().unwrap_or_else(|p| p.into_inner());
        for line in lines {
            settings.insert(setting_key(line), line.to_string());
        }
    }

    pub(crate) fn current(&self) -> Vec<String> {
        self.settings
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn apply_calls(&self) -> Vec<Vec<String>> {
        self.applied
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub(crate) fn scripts_run(&self) -> Vec<PathBuf> {
        self.scripts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

fn setting_key(line: &str) -> String {
    let line = line.trim().trim_end_matches(';');
    match line.find(" TO ") {
        Some(idx) => line[..idx].to_string(),
        None => line
            .rsplit_once(' ')
            .map(|(head, _)| head.to_string())
            .unwrap_or_else(|| line.to_string()),
    }
}

impl Engine for FakeEngine {
    fn capture_config(&self) -> Result<Vec<String>> {
        // Mimic `show all`: a header line the capture must filter out.
        let mut output = vec!["RMAN configuration parameters are:".to_string()];
        output.extend(self.current());
        Ok(output)
    }

    fn apply_config(&self, settings: &[String]) -> Result<()> {
        self.applied
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(settings.to_vec());
        let refs: Vec<&str> = settings.iter().map(String::as_str).collect();
        self.set(&refs);
        Ok(())
    }

    fn run_script(&self, script: &Path) -> Result<()> {
        self.scripts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(script.to_path_buf());
        if self.fail_scripts {
            return Err(CoordError::EngineError(format!(
                "script '{}' reported RMAN-03009",
                script.display()
            )));
        }
        Ok(())
    }
}
