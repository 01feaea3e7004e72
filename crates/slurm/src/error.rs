// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlurmError {
    #[error("failed to spawn {command}: {source}")]
    Spawn { command: String, source: std::io::Error },

    #[error("{command} failed with {status}: {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },

    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("could not parse a job ID from sbatch output: {output:?}")]
    NoJobId { output: String },

    #[error("I/O error talking to {command}: {source}")]
    Io { command: String, source: std::io::Error },
}
