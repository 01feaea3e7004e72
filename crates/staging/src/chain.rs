// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered chain of staging steps.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::PipelineState;
use crate::step::{StagingError, Step};

/// The staging chain declared under the config's `staging` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chain {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Chain {
    /// Validate every step's configuration.
    pub fn validate(&self) -> Result<(), StagingError> {
        for step in &self.steps {
            step.validate()?;
        }
        Ok(())
    }

    /// Run candidates through all steps in declared order.
    ///
    /// An empty intermediate result short-circuits the remaining steps.
    pub fn apply(&self, candidates: Vec<PathBuf>, state: &PipelineState) -> Vec<PathBuf> {
        let mut result = candidates;
        for step in &self.steps {
            result = step.apply(result, state);
            if result.is_empty() {
                break;
            }
        }
        result
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "chain_props.rs"]
mod props;
