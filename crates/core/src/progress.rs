// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only progress snapshot derived from the workspace.
//!
//! Counters come entirely from directory listings, so the reporter is safe
//! to run concurrently with a live supervisor. Entries are classified by
//! suffix alone: extension-less files are in-flight, `.err` files are
//! failures, everything else in a task directory is a processed output.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::ext::{is_extensionless, ERR_EXT};
use crate::workspace::Workspace;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("output directory does not exist: {0}")]
    MissingOutputDir(PathBuf),

    #[error("not a pipeline directory (missing {0})")]
    NotAPipeline(PathBuf),

    #[error("failed to scan {path}: {source}")]
    Scan { path: PathBuf, source: std::io::Error },
}

/// Per-task progress counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskProgress {
    pub name: String,
    /// Successful outputs present in the task directory.
    pub processed: Vec<String>,
    /// Extension-less in-flight temporaries.
    pub ongoing: Vec<String>,
    /// Captured `.err` reports.
    pub failed: Vec<String>,
}

/// Pipeline-wide progress counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineProgress {
    /// Names currently staged under `.symlinks/`.
    pub staged: Vec<String>,
    /// Names marked complete under `.finished/`.
    pub finished: Vec<String>,
    pub tasks: Vec<TaskProgress>,
}

impl PipelineProgress {
    /// Scan the workspace under `output_root`.
    pub fn scan(output_root: &Path) -> Result<Self, ProgressError> {
        if !output_root.exists() {
            return Err(ProgressError::MissingOutputDir(output_root.to_path_buf()));
        }
        let ws = Workspace::new(output_root);
        let internal = ws.internal_dir();
        if !internal.exists() {
            return Err(ProgressError::NotAPipeline(internal));
        }

        let mut progress = PipelineProgress {
            staged: list_entries(&ws.symlinks_dir())?,
            finished: list_entries(&ws.finished_dir())?,
            tasks: Vec::new(),
        };

        let entries = std::fs::read_dir(&internal)
            .map_err(|source| ProgressError::Scan { path: internal.clone(), source })?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            progress.tasks.push(scan_task_dir(name, &entry.path())?);
        }
        progress.tasks.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(progress)
    }

    /// Total failures across all tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().map(|t| t.failed.len()).sum()
    }
}

fn scan_task_dir(name: String, dir: &Path) -> Result<TaskProgress, ProgressError> {
    let mut task = TaskProgress { name, ..TaskProgress::default() };
    let entries = std::fs::read_dir(dir)
        .map_err(|source| ProgressError::Scan { path: dir.to_path_buf(), source })?;
    for entry in entries.flatten() {
        if !entry.path().is_file() {
            continue;
        }
        let file = entry.file_name().to_string_lossy().into_owned();
        if is_extensionless(&file) {
            task.ongoing.push(file);
        } else if file.ends_with(ERR_EXT) {
            task.failed.push(file);
        } else {
            task.processed.push(file);
        }
    }
    task.processed.sort();
    task.ongoing.sort();
    task.failed.sort();
    Ok(task)
}

fn list_entries(dir: &Path) -> Result<Vec<String>, ProgressError> {
    let mut names = Vec::new();
    let entries = std::fs::read_dir(dir)
        .map_err(|source| ProgressError::Scan { path: dir.to_path_buf(), source })?;
    for entry in entries.flatten() {
        // Symlinks count even when their target is gone.
        if entry.path().is_file() || entry.path().is_symlink() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
