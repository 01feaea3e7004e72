// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tigerflow status` - report pipeline liveness and progress.

use std::path::PathBuf;

use clap::Args;

use crate::exit_error::ExitError;
use tf_core::{PipelineProgress, Workspace};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Pipeline output directory (must contain .tigerflow)
    pub output_dir: PathBuf,

    /// Output status in JSON format for machine consumption
    #[arg(long = "json")]
    pub output_json: bool,
}

pub fn status(args: StatusArgs) -> Result<i32, ExitError> {
    let ws = Workspace::new(&args.output_dir);

    if !args.output_dir.exists() {
        output_error("Output directory does not exist", args.output_json);
        return Ok(1);
    }
    if !ws.internal_dir().exists() {
        output_error("Not a valid pipeline directory (missing .tigerflow)", args.output_json);
        return Ok(1);
    }

    let pid = tf_core::read_pid_file(&ws.pid_file());
    let running = pid.is_some_and(tf_core::is_process_running);

    let progress = match PipelineProgress::scan(&args.output_dir) {
        Ok(progress) => progress,
        Err(e) => {
            output_error(&format!("Failed to read progress: {e}"), args.output_json);
            return Ok(1);
        }
    };

    if args.output_json {
        output_json(pid, running, &progress);
    } else {
        output_human(pid, running, &progress);
    }

    // 0 = running, 1 = not running.
    Ok(if running { 0 } else { 1 })
}

fn output_error(message: &str, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("Error: {message}");
    }
}

fn output_json(pid: Option<i32>, running: bool, progress: &PipelineProgress) {
    let data = serde_json::json!({
        "pid": pid,
        "running": running,
        "staged": progress.staged.len(),
        "finished": progress.finished.len(),
        "failed": progress.failed_count(),
        "tasks": progress.tasks.iter().map(|task| {
            serde_json::json!({
                "name": task.name,
                "processed": task.processed.len(),
                "ongoing": task.ongoing.len(),
                "failed": task.failed.len(),
            })
        }).collect::<Vec<_>>(),
    });
    match serde_json::to_string_pretty(&data) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{data}"),
    }
}

fn output_human(pid: Option<i32>, running: bool, progress: &PipelineProgress) {
    match (running, pid) {
        (true, Some(pid)) => println!("Pipeline running (pid {pid})"),
        (false, Some(pid)) => println!("Pipeline stopped (stale pid {pid})"),
        _ => println!("Pipeline not running"),
    }
    println!();

    let total = progress.staged.len() + progress.finished.len();
    println!(
        "Files: {}/{} finished, {} failed",
        progress.finished.len(),
        total,
        progress.failed_count()
    );

    if progress.tasks.is_empty() {
        return;
    }
    println!();
    println!("{:<20} {:>10} {:>10} {:>10}", "Task", "Processed", "Ongoing", "Failed");
    for task in &progress.tasks {
        println!(
            "{:<20} {:>10} {:>10} {:>10}",
            task.name,
            task.processed.len(),
            task.ongoing.len(),
            task.failed.len()
        );
    }
}
