// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Count task: writes the input's byte count.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use clap::Parser;

use crate::cli::{CliError, TaskArgs};
use crate::context::SetupContext;
use crate::task::{FileTask, TaskError};

pub(crate) const DESCRIPTION: &str = "Write each input file's byte count.";

#[derive(Debug, Parser)]
#[command(name = "count", about = DESCRIPTION)]
struct CountCli {
    #[command(flatten)]
    task: TaskArgs,
}

/// Writes the input size in bytes as decimal text.
#[derive(Debug, Clone, Default)]
pub struct Count;

#[async_trait]
impl FileTask for Count {
    async fn run(
        &self,
        _context: &SetupContext,
        input: &Path,
        output: &Path,
    ) -> Result<(), TaskError> {
        let bytes = std::fs::metadata(input)?.len();
        std::fs::write(output, bytes.to_string())?;
        Ok(())
    }
}

pub(crate) fn run_cli(argv: Vec<OsString>) -> Result<i32, CliError> {
    let cli = CountCli::try_parse_from(argv)?;
    crate::cli::execute_blocking(Count, cli.task)
}
