// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in task registry.
//!
//! Built-ins compile into the main binary and are launched as
//! `tigerflow task exec <name> …`, so a `library:` task needs no module
//! on disk. Each entry parses its own argument vector: the shared task
//! contract plus whatever params the task declares.

mod count;
mod echo;

use std::ffi::OsString;

use crate::cli::CliError;

pub use count::Count;
pub use echo::Echo;

/// One registered built-in task.
pub struct TaskEntry {
    pub name: &'static str,
    /// First line of the task's documentation.
    pub description: &'static str,
    pub run: fn(Vec<OsString>) -> Result<i32, CliError>,
}

/// The compiled-in registry.
pub fn builtin_tasks() -> &'static [TaskEntry] {
    &[
        TaskEntry { name: "count", description: count::DESCRIPTION, run: count::run_cli },
        TaskEntry { name: "echo", description: echo::DESCRIPTION, run: echo::run_cli },
    ]
}

pub fn find(name: &str) -> Option<&'static TaskEntry> {
    builtin_tasks().iter().find(|entry| entry.name == name)
}

/// Version reported by `tasks list`/`tasks info`.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
