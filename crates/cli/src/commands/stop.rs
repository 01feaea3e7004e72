// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tigerflow stop` - signal a running pipeline.

use std::path::PathBuf;

use clap::Args;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::exit_error::ExitError;
use tf_core::Workspace;

#[derive(Debug, Args)]
pub struct StopArgs {
    /// Pipeline output directory (must contain .tigerflow)
    pub output_dir: PathBuf,

    /// Send SIGKILL instead of SIGTERM for immediate termination
    #[arg(long, short = 'f')]
    pub force: bool,
}

pub fn stop(args: StopArgs) -> Result<i32, ExitError> {
    let ws = Workspace::new(&args.output_dir);

    if !args.output_dir.exists() {
        eprintln!("Error: Output directory does not exist");
        return Ok(1);
    }
    if !ws.internal_dir().exists() {
        eprintln!("Error: Not a valid pipeline directory (missing .tigerflow)");
        return Ok(1);
    }

    let pid_file = ws.pid_file();
    let Some(pid) = tf_core::read_pid_file(&pid_file) else {
        println!("Pipeline is not running (no PID file)");
        return Ok(0);
    };

    if !tf_core::is_process_running(pid) {
        println!("Pipeline is not running (stale PID file, pid {pid})");
        let _ = std::fs::remove_file(&pid_file);
        return Ok(0);
    }

    let (signal, signal_name) = if args.force {
        (Signal::SIGKILL, "SIGKILL")
    } else {
        (Signal::SIGTERM, "SIGTERM")
    };

    match kill(Pid::from_raw(pid), signal) {
        Ok(()) => {
            println!("Sent {signal_name} to pipeline (pid {pid})");
            Ok(0)
        }
        Err(Errno::ESRCH) => {
            println!("Pipeline already stopped (pid {pid})");
            let _ = std::fs::remove_file(&pid_file);
            Ok(0)
        }
        Err(Errno::EPERM) => {
            eprintln!("Error: Permission denied to stop pipeline (pid {pid})");
            Ok(1)
        }
        Err(e) => Err(ExitError::new(1, format!("failed to signal pipeline (pid {pid}): {e}"))),
    }
}
