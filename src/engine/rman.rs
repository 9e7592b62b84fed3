//! Driving the `rman` command-line client.

use super::Engine;
use super::output::{ErrorScanner, mask_credentials};
use super::script::expand_placeholders;
use crate::error::{CoordError, Result};
use crate::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Everything needed to start the engine.
#[derive(Debug, Clone)]
pub struct RmanSettings {
    /// Program and leading arguments, e.g. `["rman"]`.
    pub command: Vec<String>,
    pub target_connection: String,
    pub catalog_connection: Option<String>,
    pub nls_date_format: String,
    pub file_format: String,
    pub parallel_slaves: u32,
    pub channel_device: String,
    /// Directory for generated command files.
    pub work_dir: PathBuf,
}

/// Pid of the engine process currently running, if any.
///
/// Shared with the signal listener so it can stop the engine.
#[derive(Debug, Clone, Default)]
pub struct ChildSlot {
    pid: Arc<Mutex<Option<u32>>>,
}

impl ChildSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<u32> {
        *self.pid.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set(&self, pid: Option<u32>) {
        *self.pid.lock().unwrap_or_else(|p| p.into_inner()) = pid;
    }

    /// Ask the running engine process, if any, to terminate.
    pub fn terminate(&self) {
        let Some(pid) = self.current() else {
            return;
        };
        warn!(pid, "terminating RMAN");

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            if let Ok(raw) = i32::try_from(pid)
                && let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM)
            {
                warn!(pid, error = %e, "failed to signal RMAN");
            }
        }
    }
}

/// [`Engine`] backed by the `rman` executable.
#[derive(Debug)]
pub struct RmanEngine {
    settings: RmanSettings,
    scanner: ErrorScanner,
    child: ChildSlot,
    pid: u32,
}

impl RmanEngine {
    pub fn new(settings: RmanSettings, scanner: ErrorScanner, child: ChildSlot) -> Self {
        Self {
            settings,
            scanner,
            child,
            pid: std::process::id(),
        }
    }

    #[cfg(test)]
    pub(crate) fn settings(&self) -> &RmanSettings {
        &self.settings
    }

    /// Write `commands` to a fresh command file, run it, and return the
    /// combined output lines.
    fn run(&self, label: &str, commands: &str) -> Result<Vec<String>> {
        std::fs::create_dir_all(&self.settings.work_dir).map_err(|e| {
            CoordError::IoFailure(format!(
                "failed to create directory '{}': {}",
                self.settings.work_dir.display(),
                e
            ))
        })?;

        let cmd_file = self
            .settings
            .work_dir
            .join(format!("rmanrun_{}.{}.rcv", label, self.pid));
        self.write_command_file(&cmd_file, commands)?;

        let outcome = self.execute(&cmd_file);

        if let Err(e) = fs::remove_if_exists(&cmd_file) {
            warn!(error = %e, "failed to remove command file");
        }

        outcome
    }

    fn write_command_file(&self, path: &Path, commands: &str) -> Result<()> {
        info!(file = %path.display(), "command file contents:");
        for line in commands.lines() {
            info!("  {}", line);
        }

        let mut content = format!("connect target {}\n", self.settings.target_connection);
        if let Some(catalog) = &self.settings.catalog_connection {
            content.push_str(&format!("connect catalog {}\n", catalog));
        }
        content.push_str(commands);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                CoordError::IoFailure(format!("failed to create '{}': {}", path.display(), e))
            })?;

        file.write_all(content.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                CoordError::IoFailure(format!("failed to write '{}': {}", path.display(), e))
            })
    }

    fn execute(&self, cmd_file: &Path) -> Result<Vec<String>> {
        let Some((program, args)) = self.settings.command.split_first() else {
            return Err(CoordError::UserError(
                "engine command is empty".to_string(),
            ));
        };

        info!(program = %program, "running RMAN");

        let child = Command::new(program)
            .args(args)
            .arg("cmdfile")
            .arg(cmd_file)
            .env("NLS_DATE_FORMAT", &self.settings.nls_date_format)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CoordError::EngineError(format!(
                    "failed to execute '{}': {}\nFix: ensure the engine is installed and in PATH.",
                    program, e
                ))
            })?;

        self.child.set(Some(child.id()));
        let output = child.wait_with_output();
        self.child.set(None);

        let output = output.map_err(|e| {
            CoordError::EngineError(format!("failed to wait for '{}': {}", program, e))
        })?;

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(str::to_string)
            .collect();

        for line in &lines {
            info!("RMAN: {}", mask_credentials(line));
        }

        if !output.status.success() {
            error!(status = %output.status, "RMAN ran with errors");
            return Err(CoordError::EngineError(format!(
                "RMAN exited with {}",
                output.status
            )));
        }

        let failures = self.scanner.failures(&lines);
        if !failures.is_empty() {
            error!(codes = ?failures, "RMAN reported failures");
            return Err(CoordError::EngineError(format!(
                "RMAN reported {}",
                failures.join(", ")
            )));
        }

        debug!("RMAN run successful");
        Ok(lines)
    }
}

impl Engine for RmanEngine {
    fn capture_config(&self) -> Result<Vec<String>> {
        info!("getting RMAN configuration");
        self.run("show", "show all;\n")
    }

    fn apply_config(&self, settings: &[String]) -> Result<()> {
        let mut commands = settings.join("\n");
        commands.push('\n');
        self.run("config", &commands).map(|_| ())
    }

    fn run_script(&self, script: &Path) -> Result<()> {
        let content = std::fs::read_to_string(script).map_err(|e| {
            CoordError::UserError(format!(
                "failed to read script '{}': {}",
                script.display(),
                e
            ))
        })?;

        if self.settings.nls_date_format.is_empty() {
            warn!("NLS_DATE_FORMAT is not set - times will not be recorded");
        }

        let commands = expand_placeholders(
            &content,
            &self.settings.file_format,
            self.settings.parallel_slaves,
            &self.settings.channel_device,
        );
        self.run("script", &commands).map(|_| ())
    }
}
