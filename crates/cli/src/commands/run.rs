// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tigerflow run` - start the pipeline supervisor.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::exit_error::ExitError;
use tf_core::{Settings, Workspace};
use tf_engine::{Pipeline, PipelineError, PipelineOptions};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Configuration file
    pub config_file: PathBuf,

    /// Directory containing input data for the pipeline
    pub input_dir: PathBuf,

    /// Directory for storing pipeline outputs and internal data
    pub output_dir: PathBuf,

    /// Terminate after this many minutes without new input or completions
    #[arg(long, value_name = "MIN")]
    pub idle_timeout: Option<u64>,

    /// Delete input files after pipeline processing
    #[arg(long)]
    pub delete_input: bool,

    /// Run the pipeline in the background, detached from the terminal
    #[arg(long, short = 'b')]
    pub background: bool,
}

pub fn run(args: RunArgs) -> Result<i32, ExitError> {
    let ws = Workspace::new(&args.output_dir);
    std::fs::create_dir_all(ws.internal_dir())
        .map_err(|e| ExitError::new(1, format!("failed to create workspace: {e}")))?;

    // Pre-check before any fork so both modes refuse early; the real lock
    // is taken by the supervisor itself.
    if let Some(pid) = tf_core::live_holder(&ws.pid_file()) {
        eprintln!("Error: Pipeline is already running (pid {pid})");
        return Ok(1);
    }

    if args.background {
        return run_in_background(&args, &ws);
    }

    let settings =
        Settings::load().map_err(|e| ExitError::new(1, format!("invalid settings: {e}")))?;
    let options = PipelineOptions {
        config_file: args.config_file,
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        delete_input: args.delete_input,
        idle_timeout: args.idle_timeout.map(|minutes| Duration::from_secs(minutes * 60)),
    };

    // The supervisor is single-threaded at the logic level.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ExitError::new(1, format!("failed to start runtime: {e}")))?;

    let outcome = runtime.block_on(async {
        let pipeline = Pipeline::prepare(options, settings).await?;
        pipeline.run().await
    });

    match outcome {
        Ok(outcome) => Ok(outcome.exit_code()),
        Err(PipelineError::AlreadyRunning(pid)) => {
            eprintln!("Error: Pipeline is already running (pid {pid})");
            Ok(1)
        }
        Err(e) => Err(ExitError::new(1, e.to_string())),
    }
}

/// Re-exec detached with stdio redirected to `run.log`.
fn run_in_background(args: &RunArgs, ws: &Workspace) -> Result<i32, ExitError> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe()
        .map_err(|e| ExitError::new(1, format!("failed to resolve executable: {e}")))?;
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(ws.log_file())
        .map_err(|e| ExitError::new(1, format!("failed to open run.log: {e}")))?;
    let log_err = log
        .try_clone()
        .map_err(|e| ExitError::new(1, format!("failed to open run.log: {e}")))?;

    let mut command = std::process::Command::new(exe);
    command
        .arg("run")
        .arg(&args.config_file)
        .arg(&args.input_dir)
        .arg(&args.output_dir)
        .stdin(std::process::Stdio::null())
        .stdout(log)
        .stderr(log_err)
        .process_group(0);
    if let Some(minutes) = args.idle_timeout {
        command.args(["--idle-timeout", &minutes.to_string()]);
    }
    if args.delete_input {
        command.arg("--delete-input");
    }

    let child = command
        .spawn()
        .map_err(|e| ExitError::new(1, format!("failed to start background pipeline: {e}")))?;
    println!("Started (pid {})", child.id());
    Ok(0)
}
