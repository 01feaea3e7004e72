// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Individual staging steps.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::PipelineState;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("invalid regex pattern {pattern:?}: {source}")]
    InvalidPattern { pattern: String, source: regex::Error },

    #[error(transparent)]
    InvalidExt(#[from] tf_core::ExtError),

    #[error("step {kind} requires a value greater than zero")]
    NonPositive { kind: &'static str },

    #[error("callable step has an empty command")]
    EmptyCommand,
}

/// Sort attribute for the `sort_by` step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Mtime,
}

/// One step of the staging chain, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Keep files of at least `bytes` bytes.
    MinSize { bytes: u64 },
    /// Keep files of at most `bytes` bytes.
    MaxSize { bytes: u64 },
    /// Keep files whose mtime is at least `seconds` old.
    MinAge { seconds: f64 },
    /// Keep files whose name matches the regex anywhere.
    FilenameMatch { pattern: String },
    /// Keep files with a sibling `<stem><ext>` companion.
    CompanionFile { ext: String },
    /// Truncate to the remaining staged capacity `max(0, count - staged)`.
    MaxStaged { count: usize },
    /// Truncate to the first `count` candidates.
    MaxBatch { count: usize },
    /// Reorder only; a permutation of its input.
    SortBy {
        #[serde(default)]
        key: SortKey,
        #[serde(default)]
        reverse: bool,
    },
    /// Delegate to an external command: candidates on stdin (one path per
    /// line), survivors on stdout. Any failure is swallowed and treated as
    /// an empty result.
    Callable { command: String },
}

impl Step {
    /// Name of the step kind, as spelled in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::MinSize { .. } => "min_size",
            Step::MaxSize { .. } => "max_size",
            Step::MinAge { .. } => "min_age",
            Step::FilenameMatch { .. } => "filename_match",
            Step::CompanionFile { .. } => "companion_file",
            Step::MaxStaged { .. } => "max_staged",
            Step::MaxBatch { .. } => "max_batch",
            Step::SortBy { .. } => "sort_by",
            Step::Callable { .. } => "callable",
        }
    }

    /// Check configuration-time constraints (positive bounds, compilable
    /// patterns, valid extensions).
    pub fn validate(&self) -> Result<(), StagingError> {
        match self {
            Step::MinSize { bytes } | Step::MaxSize { bytes } => {
                if *bytes == 0 {
                    return Err(StagingError::NonPositive { kind: self.kind() });
                }
            }
            Step::MinAge { seconds } => {
                if *seconds <= 0.0 {
                    return Err(StagingError::NonPositive { kind: self.kind() });
                }
            }
            Step::FilenameMatch { pattern } => {
                Regex::new(pattern).map_err(|source| StagingError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            }
            Step::CompanionFile { ext } => tf_core::validate_file_ext(ext)?,
            Step::MaxStaged { count } | Step::MaxBatch { count } => {
                if *count == 0 {
                    return Err(StagingError::NonPositive { kind: self.kind() });
                }
            }
            Step::SortBy { .. } => {}
            Step::Callable { command } => {
                if command.split_whitespace().next().is_none() {
                    return Err(StagingError::EmptyCommand);
                }
            }
        }
        Ok(())
    }

    /// Apply the step to the candidate list.
    pub(crate) fn apply(&self, candidates: Vec<PathBuf>, state: &PipelineState) -> Vec<PathBuf> {
        match self {
            Step::MinSize { bytes } => {
                retain_by_stat(candidates, |meta| meta.len() >= *bytes)
            }
            Step::MaxSize { bytes } => {
                retain_by_stat(candidates, |meta| meta.len() <= *bytes)
            }
            Step::MinAge { seconds } => {
                let now = SystemTime::now();
                retain_by_stat(candidates, |meta| {
                    meta.modified()
                        .ok()
                        .and_then(|mtime| now.duration_since(mtime).ok())
                        .is_some_and(|age| age.as_secs_f64() >= *seconds)
                })
            }
            Step::FilenameMatch { pattern } => match Regex::new(pattern) {
                Ok(regex) => candidates
                    .into_iter()
                    .filter(|f| regex.is_match(&file_name(f)))
                    .collect(),
                Err(_) => candidates,
            },
            Step::CompanionFile { ext } => candidates
                .into_iter()
                .filter(|f| companion(f, ext).is_file())
                .collect(),
            Step::MaxStaged { count } => {
                let capacity = count.saturating_sub(state.staged);
                let mut kept = candidates;
                kept.truncate(capacity);
                kept
            }
            Step::MaxBatch { count } => {
                let mut kept = candidates;
                kept.truncate(*count);
                kept
            }
            Step::SortBy { key, reverse } => sort_candidates(candidates, *key, *reverse),
            Step::Callable { command } => run_callable(command, &candidates),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Replace the final dotted suffix with `ext`, like `Path::with_suffix`.
fn companion(path: &Path, ext: &str) -> PathBuf {
    let name = file_name(path);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name,
    };
    path.with_file_name(format!("{stem}{ext}"))
}

fn retain_by_stat(
    candidates: Vec<PathBuf>,
    keep: impl Fn(&std::fs::Metadata) -> bool,
) -> Vec<PathBuf> {
    candidates
        .into_iter()
        .filter(|f| match f.metadata() {
            Ok(meta) => keep(&meta),
            Err(e) => {
                // A file vanished between listing and stat; the next tick
                // re-evaluates.
                tracing::warn!(file = %f.display(), error = %e, "stat failed during staging");
                false
            }
        })
        .collect()
}

fn sort_candidates(mut candidates: Vec<PathBuf>, key: SortKey, reverse: bool) -> Vec<PathBuf> {
    match key {
        SortKey::Name => candidates.sort_by_key(|f| file_name(f)),
        SortKey::Size => {
            candidates.sort_by_key(|f| f.metadata().map(|m| m.len()).unwrap_or(0));
        }
        SortKey::Mtime => {
            candidates.sort_by_key(|f| {
                f.metadata().and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH)
            });
        }
    }
    if reverse {
        candidates.reverse();
    }
    candidates
}

fn run_callable(command: &str, candidates: &[PathBuf]) -> Vec<PathBuf> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Vec::new();
    };

    let spawned = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(command, error = %e, "callable step failed to spawn");
            return Vec::new();
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        for path in candidates {
            if writeln!(stdin, "{}", path.display()).is_err() {
                break;
            }
        }
    }

    let output = match child.wait_with_output() {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(command, error = %e, "callable step failed");
            return Vec::new();
        }
    };
    if !output.status.success() {
        tracing::warn!(command, status = %output.status, "callable step exited non-zero");
        return Vec::new();
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
