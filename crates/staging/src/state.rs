// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

/// Read-only view of pipeline state handed to staging steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    /// Files in the input directory not yet staged.
    pub waiting: usize,
    /// Files staged but not completed.
    pub staged: usize,
    /// Files in the `.finished` directory.
    pub completed: usize,
    /// Total error files across tasks.
    pub failed: usize,
    /// Input directory, for companion lookups.
    pub input_dir: PathBuf,
    /// Output root, for capacity checks.
    pub output_dir: PathBuf,
}
