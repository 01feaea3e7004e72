// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tigerflow task exec` - run a built-in task's runtime.
//!
//! Launch scripts for `library:` tasks re-invoke this binary here, so the
//! built-in runtimes live in the same executable the supervisor runs.
//! Everything after the task name is handed to the task's own CLI, which
//! flag-selects the runtime variant.

use std::ffi::OsString;

use clap::Subcommand;

use crate::exit_error::ExitError;
use tf_task::cli::CliError;

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Execute a built-in task runtime
    Exec {
        /// Built-in task name
        name: String,

        /// Arguments forwarded to the task's CLI
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
}

pub fn task(command: TaskCommand) -> Result<i32, ExitError> {
    match command {
        TaskCommand::Exec { name, args } => exec(&name, args),
    }
}

fn exec(name: &str, args: Vec<OsString>) -> Result<i32, ExitError> {
    let Some(entry) = tf_task::library::find(name) else {
        return Err(ExitError::new(1, format!("unknown built-in task '{name}'")));
    };

    let mut argv: Vec<OsString> = vec![OsString::from(name)];
    argv.extend(args);

    match (entry.run)(argv) {
        Ok(code) => Ok(code),
        Err(CliError::Parse(e)) => {
            use clap::error::ErrorKind;
            // The supervisor probes launch targets with `--help`; that
            // must exit cleanly.
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
                Ok(0)
            } else {
                Err(ExitError::new(2, e.to_string()))
            }
        }
        Err(e) => Err(ExitError::new(1, e.to_string())),
    }
}
