// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID-file single-instance lock.
//!
//! The record doubles as the discovery channel for the external `status`
//! and `stop` commands, so it must stay a plain readable PID (no flock).
//! Staleness is decided by probing the recorded process with signal 0.

use std::io;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("failed to write PID file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to remove PID file {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// Parse a PID from the file; any I/O or parse failure yields `None`.
pub fn read_pid_file(path: &Path) -> Option<i32> {
    let text = std::fs::read_to_string(path).ok()?;
    text.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

/// Probe the OS for process existence without signalling it.
///
/// Permission denied means the process exists but belongs to someone else,
/// which counts as running.
pub fn is_process_running(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Return the PID of a live instance recorded at `path`, if any.
///
/// A stale record (unreadable, unparseable, or referring to a dead process)
/// is removed on the way through, so a caller that sees `None` may write
/// its own PID and proceed.
pub fn live_holder(path: &Path) -> Option<i32> {
    match read_pid_file(path) {
        Some(pid) if is_process_running(pid) => Some(pid),
        _ => {
            if path.exists() {
                let _ = std::fs::remove_file(path);
            }
            None
        }
    }
}

/// A held PID record. Removed on [`PidFile::release`] or drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process's PID to `path`.
    ///
    /// The caller is expected to have checked [`live_holder`] first; this
    /// unconditionally overwrites whatever is there.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let path = path.into();
        std::fs::write(&path, format!("{}\n", std::process::id()))
            .map_err(|source| PidFileError::Write { path: path.clone(), source })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the record, consuming the guard.
    pub fn release(self) -> Result<(), PidFileError> {
        let path = self.path.clone();
        std::mem::forget(self);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PidFileError::Remove { path, source }),
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
