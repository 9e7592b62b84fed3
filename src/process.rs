//! Process liveness probing.
//!
//! Staleness of every ledger record is decided by one question: is the pid
//! that wrote it still running *this* program? A pid that is alive but runs
//! something else is treated as stale, because the OS recycles pids.

use std::path::Path;

/// Capability to look up a process by pid.
pub trait ProcessTable: Send + Sync {
    /// Returns the executable image name if `pid` is alive, `None` otherwise.
    ///
    /// The image name may be empty when the process exists but its executable
    /// cannot be inspected (e.g. owned by another user).
    fn lookup(&self, pid: u32) -> Option<String>;
}

/// Result of probing a pid against the current program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// No such process.
    Dead,
    /// Alive, but running a different executable.
    Foreign(String),
    /// Alive and running this program.
    Instance,
}

impl Liveness {
    pub fn is_instance(&self) -> bool {
        matches!(self, Liveness::Instance)
    }
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liveness::Dead => write!(f, "dead"),
            Liveness::Foreign(image) => write!(f, "foreign ({})", image),
            Liveness::Instance => write!(f, "running"),
        }
    }
}

/// Classify `pid` relative to `program`.
pub fn classify(table: &dyn ProcessTable, pid: u32, program: &str) -> Liveness {
    match table.lookup(pid) {
        None => Liveness::Dead,
        Some(image) if normalize_image_name(&image) == program => Liveness::Instance,
        Some(image) => Liveness::Foreign(image),
    }
}

/// Reduce an executable path to the name compared between processes.
///
/// `/opt/rman/bin/rmanrun.exe` and `rmanrun` both become `rmanrun`. Linux
/// marks a replaced binary as `rmanrun (deleted)`; the marker is dropped.
pub fn normalize_image_name(image: &str) -> String {
    let image = image.trim().trim_end_matches(" (deleted)");
    let base = Path::new(image)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(image);
    base.split('.').next().unwrap_or(base).to_string()
}

/// The operating system's process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessTable;

impl ProcessTable for OsProcessTable {
    fn lookup(&self, pid: u32) -> Option<String> {
        if pid == 0 || !pid_exists(pid) {
            return None;
        }
        Some(executable_name(pid).unwrap_or_default())
    }
}

#[cfg(unix)]
fn pid_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    // Signal 0 probes for existence; EPERM means it exists under another user.
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn pid_exists(pid: u32) -> bool {
    executable_name(pid).is_some()
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    // /proc/<pid>/stat: "<pid> (<comm>) <state> ..."; comm may contain spaces.
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            stat.rfind(')')
                .and_then(|idx| stat[idx + 1..].trim_start().chars().next())
        })
        .is_some_and(|state| state == 'Z')
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: u32) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn executable_name(pid: u32) -> Option<String> {
    if let Ok(target) = std::fs::read_link(format!("/proc/{}/exe", pid)) {
        return Some(target.to_string_lossy().to_string());
    }
    std::fs::read_to_string(format!("/proc/{}/comm", pid))
        .ok()
        .map(|comm| comm.trim().to_string())
}

#[cfg(not(target_os = "linux"))]
fn executable_name(pid: u32) -> Option<String> {
    let output = std::process::Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "comm="])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}
