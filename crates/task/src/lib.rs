// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tf-task: the long-running task runtime.
//!
//! A task runtime drives one pipeline stage: scan the input directory,
//! push each unprocessed file through the user's [`FileTask`] inside an
//! atomic write, capture failures as `<stem>.err` siblings, sleep, repeat.
//! Three variants share that observable contract: [`SequentialRunner`]
//! (one file at a time), [`CooperativeRunner`] (a bounded queue drained by
//! cooperative workers), and [`ClusterRunner`] (fan-out of work units to
//! scheduler-managed worker jobs; no user code in the runtime process).
//!
//! The [`cli`] module gives every task binary the flag contract the
//! supervisor launches and probes (`--task-name`, `--input-dir`, ...,
//! `--run-directly`), and [`library`] holds the built-in tasks.

pub mod cli;
pub mod context;
pub mod library;
pub mod runner;
pub mod scan;
pub mod task;

pub use context::{ContextError, SetupContext};
pub use runner::cluster::{ClusterConfig, ClusterRunner, WorkerResources};
pub use runner::cooperative::CooperativeRunner;
pub use runner::sequential::SequentialRunner;
pub use runner::worker::{run_worker, WorkerConfig};
pub use runner::{RunnerConfig, RunnerError};
pub use task::{FileTask, TaskError};
