// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tigerflow: CLI front-end for the pipeline supervisor.

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tigerflow",
    version,
    about = "A file-flow pipeline framework optimized for HPC with Slurm integration."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a pipeline based on the given specification
    Run(commands::run::RunArgs),
    /// Check the status of a pipeline
    Status(commands::status::StatusArgs),
    /// Stop a running pipeline
    Stop(commands::stop::StopArgs),
    /// List and inspect available tasks
    #[command(subcommand)]
    Tasks(commands::tasks::TasksCommand),
    /// Internal task-runtime entry points (used by launch scripts)
    #[command(subcommand, hide = true)]
    Task(commands::task_exec::TaskCommand),
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => commands::run::run(args),
        Command::Status(args) => commands::status::status(args),
        Command::Stop(args) => commands::stop::stop(args),
        Command::Tasks(command) => commands::tasks::tasks(command),
        Command::Task(command) => commands::task_exec::task(command),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
