// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-job batch script builder.
//!
//! The cluster runtime submits one long-lived worker job at a time through
//! this builder. The client job's script is rendered separately by the
//! configuration layer; this one only covers workers, which share a job
//! name so `squeue -n <task>-worker` counts them.

use std::fmt::Write as _;
use std::path::PathBuf;

/// A renderable `#SBATCH` submission script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchScript {
    pub job_name: String,
    pub account: String,
    pub cpus: u32,
    pub gpus: Option<u32>,
    /// Memory per worker (scheduler syntax, e.g. `16G`).
    pub memory: String,
    /// Wall time (e.g. `02:00:00`).
    pub time: String,
    /// Directory receiving `%x-%j.out` / `%x-%j.err` logs.
    pub log_dir: PathBuf,
    /// Extra raw directives appended verbatim after the standard block.
    pub extra_options: Vec<String>,
    /// Commands run before the payload, one per line.
    pub prologue: Vec<String>,
    /// The payload command line.
    pub command: String,
}

impl BatchScript {
    pub fn render(&self) -> String {
        let mut script = String::new();
        let _ = writeln!(script, "#!/bin/bash");
        let _ = writeln!(script, "#SBATCH --account={}", self.account);
        let _ = writeln!(script, "#SBATCH --job-name={}", self.job_name);
        let _ = writeln!(script, "#SBATCH --output={}/%x-%j.out", self.log_dir.display());
        let _ = writeln!(script, "#SBATCH --error={}/%x-%j.err", self.log_dir.display());
        let _ = writeln!(script, "#SBATCH --nodes=1");
        let _ = writeln!(script, "#SBATCH --ntasks=1");
        let _ = writeln!(script, "#SBATCH --cpus-per-task={}", self.cpus);
        let _ = writeln!(script, "#SBATCH --mem={}", self.memory);
        let _ = writeln!(script, "#SBATCH --time={}", self.time);
        if let Some(gpus) = self.gpus {
            let _ = writeln!(script, "#SBATCH --gres=gpu:{gpus}");
        }
        for option in &self.extra_options {
            let _ = writeln!(script, "#SBATCH {option}");
        }
        let _ = writeln!(script);
        for line in &self.prologue {
            let _ = writeln!(script, "{line}");
        }
        let _ = writeln!(script);
        let _ = writeln!(script, "{}", self.command);
        script
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
