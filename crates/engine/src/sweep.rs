// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup workspace sweeps.
//!
//! Every sweep is idempotent: the supervisor may be restarted against
//! existing state after a crash, and each pass converges the workspace
//! to something the main loop can trust.

use std::path::Path;

use tf_config::PipelineConfig;
use tf_core::Workspace;

use crate::error::PipelineError;

/// Delete inputs already recorded in `.finished/` (the `delete_input`
/// startup pass).
pub(crate) fn delete_finished_inputs(
    ws: &Workspace,
    input_dir: &Path,
) -> Result<(), PipelineError> {
    let entries = std::fs::read_dir(ws.finished_dir())
        .map_err(|source| PipelineError::io("scan .finished", source))?;
    for entry in entries.flatten() {
        let source_file = input_dir.join(entry.file_name());
        if let Err(e) = std::fs::remove_file(&source_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(file = %source_file.display(), error = %e,
                    "failed to delete finished input");
            }
        }
    }
    Ok(())
}

/// Remove invalid or broken symlinks; a broken one invalidates all
/// downstream outputs for its stem, since the source data is gone.
pub(crate) fn sweep_symlinks(
    ws: &Workspace,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let root_ext = config.root_input_ext();
    let entries = std::fs::read_dir(ws.symlinks_dir())
        .map_err(|source| PipelineError::io("scan .symlinks", source))?;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !path.is_symlink() {
            tracing::warn!(file = %name, "removing non-symlink from .symlinks");
            let _ = std::fs::remove_file(&path);
            continue;
        }
        if path.exists() {
            continue;
        }
        tracing::warn!(file = %name, "removing orphaned symlink; source is gone");
        let _ = std::fs::remove_file(&path);
        let Some(stem) = tf_core::strip_ext(&name, root_ext) else {
            continue;
        };
        for task in config.tasks() {
            let output = ws.task_dir(&task.name).join(format!("{stem}{}", task.output_ext));
            match std::fs::remove_file(&output) {
                Ok(()) => {
                    tracing::warn!(file = %output.display(), "cascade-deleted stale output");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %output.display(), error = %e,
                        "failed to cascade-delete output");
                }
            }
        }
    }
    Ok(())
}

/// Delete files in each task directory that do not carry the task's
/// output extension (crash residue and stale error reports, which makes
/// their stems eligible for replay).
pub(crate) fn sweep_task_outputs(
    ws: &Workspace,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    for task in config.tasks() {
        let dir = ws.task_dir(&task.name);
        let entries = std::fs::read_dir(&dir)
            .map_err(|source| PipelineError::io(format!("scan {}", dir.display()), source))?;
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(&task.output_ext) {
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }
    Ok(())
}

/// Names already tracked: everything staged or finished.
pub(crate) fn known_stems(ws: &Workspace) -> Result<std::collections::HashSet<String>, PipelineError> {
    let mut known = std::collections::HashSet::new();
    for dir in [ws.symlinks_dir(), ws.finished_dir()] {
        let entries = std::fs::read_dir(&dir)
            .map_err(|source| PipelineError::io(format!("scan {}", dir.display()), source))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() || path.is_symlink() {
                known.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    Ok(known)
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
