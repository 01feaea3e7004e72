// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tigerflow tasks` - discover built-in and installed tasks.
//!
//! Built-ins come from the compiled-in registry. External tasks are
//! executables found on `TIGERFLOW_TASK_PATH` (colon-separated
//! directories); their description is the file's first `#` comment line
//! after the shebang.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::exit_error::ExitError;

const TASK_PATH_VAR: &str = "TIGERFLOW_TASK_PATH";

#[derive(Debug, Subcommand)]
pub enum TasksCommand {
    /// List available tasks (built-in and installed)
    List {
        /// Show full module locations
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Show detailed information about a task
    Info {
        /// Name of the task to get info about
        task_name: String,
    },
}

#[derive(Debug, Clone)]
struct ExternalTask {
    name: String,
    path: PathBuf,
    description: Option<String>,
}

pub fn tasks(command: TasksCommand) -> Result<i32, ExitError> {
    match command {
        TasksCommand::List { verbose } => list(verbose),
        TasksCommand::Info { task_name } => info(&task_name),
    }
}

fn list(verbose: bool) -> Result<i32, ExitError> {
    let builtin = tf_task::library::builtin_tasks();
    let installed = installed_tasks();

    if builtin.is_empty() && installed.is_empty() {
        println!("No tasks found.");
        return Ok(0);
    }

    println!("Built-in tasks:");
    for entry in builtin {
        let mut line = if verbose {
            format!("  {}: tigerflow task exec {}", entry.name, entry.name)
        } else {
            format!("  {}", entry.name)
        };
        line.push_str(&format!(" - {}", entry.description));
        println!("{line}");
    }

    if !installed.is_empty() {
        println!();
        println!("Installed tasks:");
        for task in installed {
            let mut line = if verbose {
                format!("  {}: {}", task.name, task.path.display())
            } else {
                format!("  {}", task.name)
            };
            if let Some(description) = &task.description {
                line.push_str(&format!(" - {description}"));
            }
            println!("{line}");
        }
    }
    Ok(0)
}

fn info(task_name: &str) -> Result<i32, ExitError> {
    if let Some(entry) = tf_task::library::find(task_name) {
        println!("Task: {}", entry.name);
        println!("Source: built-in");
        println!("Module: tigerflow task exec {}", entry.name);
        println!("Version: {}", tf_task::library::version());
        println!();
        println!("Description:");
        println!("{}", entry.description);
        return Ok(0);
    }

    if let Some(task) = installed_tasks().into_iter().find(|t| t.name == task_name) {
        println!("Task: {}", task.name);
        println!("Source: installed");
        println!("Module: {}", task.path.display());
        if let Some(description) = &task.description {
            println!();
            println!("Description:");
            println!("{description}");
        }
        return Ok(0);
    }

    println!("Task '{task_name}' not found.");
    println!("Run 'tigerflow tasks list' to see available tasks.");
    Ok(1)
}

fn installed_tasks() -> Vec<ExternalTask> {
    let Ok(path_var) = std::env::var(TASK_PATH_VAR) else {
        return Vec::new();
    };
    let mut tasks = Vec::new();
    for dir in path_var.split(':').filter(|d| !d.is_empty()) {
        tasks.extend(scan_task_dir(Path::new(dir)));
    }
    tasks.sort_by(|a, b| a.name.cmp(&b.name));
    tasks
}

fn scan_task_dir(dir: &Path) -> Vec<ExternalTask> {
    use std::os::unix::fs::PermissionsExt;

    let mut tasks = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return tasks;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let executable = entry
            .metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
        if !executable {
            continue;
        }
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        tasks.push(ExternalTask { name, description: leading_comment(&path), path });
    }
    tasks
}

/// First `#` comment line after the shebang.
fn leading_comment(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("#!") || line.is_empty() {
            continue;
        }
        let text = line.strip_prefix('#')?.trim();
        if text.is_empty() {
            return None;
        }
        return Some(text.to_string());
    }
    None
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
