// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task configuration model.
//!
//! Deserialization goes through a raw struct carrying the superset of all
//! kind-specific fields (with `deny_unknown_fields`), then conversion
//! enforces which fields each kind requires or forbids. This keeps the
//! public `Task` free of impossible states: a local task simply has no
//! cluster resources to misread.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::validate::ConfigError;

/// Output extension used when a task omits `output_ext`.
pub const DEFAULT_OUTPUT_EXT: &str = ".out";

/// Cluster resource descriptor for `slurm` tasks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlurmResources {
    pub cpus: u32,
    #[serde(default)]
    pub gpus: Option<u32>,
    /// Memory per worker, passed through to the scheduler (e.g. `4G`).
    pub memory: String,
    /// Wall time per worker (e.g. `01:00:00`).
    pub time: String,
    /// Extra raw submission options, one per entry.
    #[serde(default)]
    pub sbatch_options: Vec<String>,
}

/// What a task runs: a user script on disk, or a named built-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// Path to an executable implementing the task CLI contract.
    Module(PathBuf),
    /// Name of a task from the built-in/installed registry.
    Library(String),
}

/// Runtime variant selector plus its kind-specific knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Sequential runtime: one file at a time.
    Local,
    /// Cooperative-concurrent runtime with a bounded worker count.
    LocalAsync { concurrency_limit: usize },
    /// Cluster fan-out runtime.
    Slurm {
        account: String,
        max_workers: usize,
        worker_resources: SlurmResources,
    },
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Local => "local",
            TaskKind::LocalAsync { .. } => "local_async",
            TaskKind::Slurm { .. } => "slurm",
        }
    }
}

/// A validated pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub kind: TaskKind,
    /// Task this one consumes from; `None` for roots.
    pub depends_on: Option<String>,
    pub target: LaunchTarget,
    /// Free-form user parameters, forwarded as CLI arguments.
    pub params: IndexMap<String, serde_yaml::Value>,
    pub input_ext: String,
    pub output_ext: String,
    /// Promote outputs to the user-visible directory on completion.
    pub keep_output: bool,
    /// Shell fragments run before the task starts. Local launch scripts
    /// join them with `;`; cluster scripts emit one per prologue line.
    pub setup_commands: Vec<String>,
}

impl Task {
    /// The cluster client job name (`<task>-client`).
    pub fn client_job_name(&self) -> String {
        format!("{}-client", self.name)
    }

    /// The cluster worker job name (`<task>-worker`).
    pub fn worker_job_name(&self) -> String {
        format!("{}-worker", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RawKind {
    Local,
    LocalAsync,
    Slurm,
}

/// Superset of all task fields; conversion enforces kind rules.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTask {
    pub name: String,
    pub kind: RawKind,
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub module: Option<PathBuf>,
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub params: IndexMap<String, serde_yaml::Value>,
    pub input_ext: String,
    #[serde(default)]
    pub output_ext: Option<String>,
    #[serde(default)]
    pub keep_output: Option<bool>,
    #[serde(default)]
    pub setup_commands: Vec<String>,
    #[serde(default)]
    pub concurrency_limit: Option<usize>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub worker_resources: Option<SlurmResources>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    pub tasks: Vec<RawTask>,
    #[serde(default)]
    pub staging: tf_staging::Chain,
}

impl RawTask {
    pub(crate) fn into_task(self) -> Result<Task, ConfigError> {
        let name = self.name;
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyTaskName);
        }

        let target = match (self.module, self.library) {
            (Some(module), None) => LaunchTarget::Module(module),
            (None, Some(library)) => LaunchTarget::Library(library),
            (None, None) => return Err(ConfigError::MissingTarget { task: name }),
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousTarget { task: name }),
        };

        let require = |field: &'static str, present: bool| {
            if present {
                Ok(())
            } else {
                Err(ConfigError::MissingField { task: name.clone(), field })
            }
        };
        let forbid = |field: &'static str, absent: bool| {
            if absent {
                Ok(())
            } else {
                Err(ConfigError::UnexpectedField {
                    task: name.clone(),
                    field,
                    kind: kind_name(self.kind),
                })
            }
        };

        let kind = match self.kind {
            RawKind::Local => {
                forbid("concurrency_limit", self.concurrency_limit.is_none())?;
                forbid("account", self.account.is_none())?;
                forbid("max_workers", self.max_workers.is_none())?;
                forbid("worker_resources", self.worker_resources.is_none())?;
                TaskKind::Local
            }
            RawKind::LocalAsync => {
                require("concurrency_limit", self.concurrency_limit.is_some())?;
                forbid("account", self.account.is_none())?;
                forbid("max_workers", self.max_workers.is_none())?;
                forbid("worker_resources", self.worker_resources.is_none())?;
                let concurrency_limit = self.concurrency_limit.unwrap_or_default();
                if concurrency_limit == 0 {
                    return Err(ConfigError::NonPositiveField {
                        task: name,
                        field: "concurrency_limit",
                    });
                }
                TaskKind::LocalAsync { concurrency_limit }
            }
            RawKind::Slurm => {
                forbid("concurrency_limit", self.concurrency_limit.is_none())?;
                require("account", self.account.is_some())?;
                require("max_workers", self.max_workers.is_some())?;
                require("worker_resources", self.worker_resources.is_some())?;
                let max_workers = self.max_workers.unwrap_or_default();
                if max_workers == 0 {
                    return Err(ConfigError::NonPositiveField { task: name, field: "max_workers" });
                }
                let worker_resources = match self.worker_resources {
                    Some(r) => r,
                    None => {
                        return Err(ConfigError::MissingField {
                            task: name,
                            field: "worker_resources",
                        })
                    }
                };
                if worker_resources.cpus == 0 {
                    return Err(ConfigError::NonPositiveField { task: name, field: "cpus" });
                }
                TaskKind::Slurm {
                    account: self.account.unwrap_or_default(),
                    max_workers,
                    worker_resources,
                }
            }
        };

        Ok(Task {
            name,
            kind,
            depends_on: self.depends_on,
            target,
            params: self.params,
            input_ext: self.input_ext,
            output_ext: self.output_ext.unwrap_or_else(|| DEFAULT_OUTPUT_EXT.to_string()),
            keep_output: self.keep_output.unwrap_or(true),
            setup_commands: self.setup_commands,
        })
    }
}

fn kind_name(kind: RawKind) -> &'static str {
    match kind {
        RawKind::Local => "local",
        RawKind::LocalAsync => "local_async",
        RawKind::Slurm => "slurm",
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
