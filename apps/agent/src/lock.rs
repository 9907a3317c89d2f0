//! Single-instance guard backed by a PID file.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Held for the lifetime of the agent; removes the lock file on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Claims the lock at `path`.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] when the file names a live
    /// process running the same program as us. A lock left by a dead process,
    /// by a PID since reused by another program, or holding garbage is taken
    /// over.
    pub fn acquire(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::acquire_as(path.into(), std::process::id())
    }

    fn acquire_as(path: PathBuf, pid: u32) -> io::Result<Self> {
        if let Some(owner) = read_pid(&path) {
            if owner != pid && instance_running(owner) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("another instance is running (pid {owner})"),
                ));
            }
            tracing::debug!(pid = owner, "taking over stale instance lock");
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, pid.to_string())?;
        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Only remove the file if it is still ours.
        if read_pid(&self.path) == Some(self.pid) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether `pid` is alive and runs the same executable as this process.
///
/// Does synchronous system calls; only used once at startup.
fn instance_running(pid: u32) -> bool {
    let owner = Pid::from_u32(pid);
    let me = Pid::from_u32(std::process::id());

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[owner, me]), true);

    let Some(owner_name) = process_name(&sys, owner) else {
        return false;
    };
    match process_name(&sys, me) {
        Some(own_name) => owner_name == own_name,
        None => {
            tracing::debug!("own process not found in process table");
            false
        }
    }
}

fn process_name(sys: &System, pid: Pid) -> Option<OsString> {
    sys.process(pid).map(|p| p.name().to_ascii_lowercase())
}
