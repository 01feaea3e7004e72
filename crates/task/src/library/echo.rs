// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Echo task: copies input to output with optional transformations.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use clap::Parser;

use crate::cli::{CliError, TaskArgs};
use crate::context::SetupContext;
use crate::task::{FileTask, TaskError};

pub(crate) const DESCRIPTION: &str =
    "Copy input files to output with optional prefix/suffix.";

#[derive(Debug, Parser)]
#[command(name = "echo", about = DESCRIPTION)]
struct EchoCli {
    #[command(flatten)]
    task: TaskArgs,

    /// Text to prepend to the content
    #[arg(long, default_value = "")]
    prefix: String,

    /// Text to append to the content
    #[arg(long, default_value = "")]
    suffix: String,

    /// Convert content to uppercase
    #[arg(long)]
    uppercase: bool,
}

/// Copy with optional prefix/suffix/uppercase.
#[derive(Debug, Clone, Default)]
pub struct Echo {
    pub prefix: String,
    pub suffix: String,
    pub uppercase: bool,
}

#[async_trait]
impl FileTask for Echo {
    async fn run(
        &self,
        _context: &SetupContext,
        input: &Path,
        output: &Path,
    ) -> Result<(), TaskError> {
        let mut content = std::fs::read_to_string(input)?;
        if self.uppercase {
            content = content.to_uppercase();
        }
        std::fs::write(output, format!("{}{content}{}", self.prefix, self.suffix))?;
        Ok(())
    }
}

pub(crate) fn run_cli(argv: Vec<OsString>) -> Result<i32, CliError> {
    let cli = EchoCli::try_parse_from(argv)?;
    let task = Echo { prefix: cli.prefix, suffix: cli.suffix, uppercase: cli.uppercase };
    crate::cli::execute_blocking(task, cli.task)
}

#[cfg(test)]
#[path = "echo_tests.rs"]
mod tests;
