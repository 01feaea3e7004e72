// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The user-facing task interface.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::SetupContext;

/// Failure from user task code, captured into `<stem>.err`.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TaskError {
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

/// One pipeline stage's processing logic.
///
/// `setup` runs exactly once per worker process before any file is
/// handled; the context it populates is frozen afterwards. `run` is
/// invoked per file inside an atomic-write window: it writes to the
/// given temporary `output` path and the runtime renames the result into
/// place on success or captures the error as `<stem>.err` on failure.
/// `teardown` runs once on cooperative shutdown.
#[async_trait]
pub trait FileTask: Send + Sync + 'static {
    async fn setup(&self, _context: &mut SetupContext) -> Result<(), TaskError> {
        Ok(())
    }

    async fn run(
        &self,
        context: &SetupContext,
        input: &Path,
        output: &Path,
    ) -> Result<(), TaskError>;

    async fn teardown(&self, _context: &SetupContext) -> Result<(), TaskError> {
        Ok(())
    }
}
