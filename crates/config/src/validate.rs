// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading and task-graph validation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{LaunchTarget, RawConfig, Task};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("pipeline must have at least one task")]
    NoTasks,

    #[error("task name must not be empty")]
    EmptyTaskName,

    #[error("duplicate task name: {0}")]
    DuplicateName(String),

    #[error("task '{task}': either 'module' or 'library' must be specified")]
    MissingTarget { task: String },

    #[error("task '{task}': cannot specify both 'module' and 'library'")]
    AmbiguousTarget { task: String },

    #[error("task '{task}': missing required field '{field}'")]
    MissingField { task: String, field: &'static str },

    #[error("task '{task}': field '{field}' is not allowed for kind '{kind}'")]
    UnexpectedField { task: String, field: &'static str, kind: &'static str },

    #[error("task '{task}': '{field}' must be greater than zero")]
    NonPositiveField { task: String, field: &'static str },

    #[error("task '{task}': invalid {field}: {source}")]
    InvalidExt { task: String, field: &'static str, source: tf_core::ExtError },

    #[error("task '{task}': module does not exist: {path}")]
    ModuleMissing { task: String, path: PathBuf },

    #[error("task '{task}': module is not a file: {path}")]
    ModuleNotAFile { task: String, path: PathBuf },

    #[error("task '{task}' depends on unknown task '{parent}'")]
    UnknownParent { task: String, parent: String },

    #[error(
        "extension mismatch: task '{parent}' outputs '{parent_ext}' but \
         its dependent task '{task}' expects '{input_ext}'"
    )]
    ExtMismatch { parent: String, parent_ext: String, task: String, input_ext: String },

    #[error("task dependency graph contains a cycle")]
    Cycle,

    #[error("root tasks must have the same input extension")]
    MixedRootInputs,

    #[error("invalid staging chain: {0}")]
    Staging(#[from] tf_staging::StagingError),
}

/// A loaded, validated pipeline configuration.
///
/// `tasks` is held in topological order (parents before children), fixed
/// once at load time.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    tasks: Vec<Task>,
    pub staging: tf_staging::Chain,
}

impl PipelineConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate a YAML config document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        let mut tasks = Vec::with_capacity(raw.tasks.len());
        for raw_task in raw.tasks {
            tasks.push(validate_task(raw_task.into_task()?)?);
        }
        let tasks = validate_graph(tasks)?;
        raw.staging.validate()?;
        Ok(Self { tasks, staging: raw.staging })
    }

    /// Tasks in topological order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Tasks with no parent; they consume staged inputs.
    pub fn root_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.depends_on.is_none())
    }

    /// Tasks with no descendants; completion is judged against them.
    pub fn terminal_tasks(&self) -> impl Iterator<Item = &Task> {
        let parents: HashSet<&str> = self
            .tasks
            .iter()
            .filter_map(|t| t.depends_on.as_deref())
            .collect();
        self.tasks.iter().filter(move |t| !parents.contains(t.name.as_str()))
    }

    /// The pipeline's input extension (shared by all root tasks).
    pub fn root_input_ext(&self) -> &str {
        // Validation guarantees at least one root with a uniform extension.
        self.tasks
            .iter()
            .find(|t| t.depends_on.is_none())
            .map(|t| t.input_ext.as_str())
            .unwrap_or_default()
    }
}

fn validate_task(task: Task) -> Result<Task, ConfigError> {
    tf_core::validate_file_ext(&task.input_ext).map_err(|source| ConfigError::InvalidExt {
        task: task.name.clone(),
        field: "input_ext",
        source,
    })?;
    tf_core::validate_file_ext(&task.output_ext).map_err(|source| ConfigError::InvalidExt {
        task: task.name.clone(),
        field: "output_ext",
        source,
    })?;

    if let LaunchTarget::Module(path) = &task.target {
        if !path.exists() {
            return Err(ConfigError::ModuleMissing { task: task.name, path: path.clone() });
        }
        if !path.is_file() {
            return Err(ConfigError::ModuleNotAFile { task: task.name, path: path.clone() });
        }
        // Re-anchor to an absolute path so launch scripts survive cwd changes.
        let canonical = path.canonicalize().map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut task = task;
        task.target = LaunchTarget::Module(canonical);
        return Ok(task);
    }

    Ok(task)
}

/// Check the graph invariants and return the tasks topologically sorted.
fn validate_graph(tasks: Vec<Task>) -> Result<Vec<Task>, ConfigError> {
    if tasks.is_empty() {
        return Err(ConfigError::NoTasks);
    }

    let mut seen = HashSet::new();
    for task in &tasks {
        if !seen.insert(task.name.as_str()) {
            return Err(ConfigError::DuplicateName(task.name.clone()));
        }
    }

    let by_name: HashMap<&str, &Task> = tasks.iter().map(|t| (t.name.as_str(), t)).collect();
    for task in &tasks {
        let Some(parent_name) = task.depends_on.as_deref() else {
            continue;
        };
        let Some(parent) = by_name.get(parent_name) else {
            return Err(ConfigError::UnknownParent {
                task: task.name.clone(),
                parent: parent_name.to_string(),
            });
        };
        if parent.output_ext != task.input_ext {
            return Err(ConfigError::ExtMismatch {
                parent: parent.name.clone(),
                parent_ext: parent.output_ext.clone(),
                task: task.name.clone(),
                input_ext: task.input_ext.clone(),
            });
        }
    }

    // Every node has at most one parent by construction, so the graph is a
    // forest of in-trees iff it is acyclic. Kahn's algorithm doubles as the
    // cycle check: anything left unvisited sits on a cycle.
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for task in &tasks {
        match task.depends_on.as_deref() {
            Some(parent) => children.entry(parent).or_default().push(task.name.as_str()),
            None => queue.push_back(task.name.as_str()),
        }
    }

    let mut order: Vec<&str> = Vec::with_capacity(tasks.len());
    while let Some(name) = queue.pop_front() {
        order.push(name);
        if let Some(kids) = children.get(name) {
            for kid in kids {
                queue.push_back(kid);
            }
        }
    }
    if order.len() != tasks.len() {
        return Err(ConfigError::Cycle);
    }

    let root_exts: HashSet<&str> = tasks
        .iter()
        .filter(|t| t.depends_on.is_none())
        .map(|t| t.input_ext.as_str())
        .collect();
    if root_exts.len() > 1 {
        return Err(ConfigError::MixedRootInputs);
    }

    let rank: HashMap<String, usize> =
        order.iter().enumerate().map(|(i, name)| (name.to_string(), i)).collect();
    let mut tasks = tasks;
    tasks.sort_by_key(|t| rank.get(t.name.as_str()).copied().unwrap_or(usize::MAX));
    Ok(tasks)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "validate_props.rs"]
mod props;
