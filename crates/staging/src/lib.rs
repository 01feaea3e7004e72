// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tf-staging: the staging middleware chain.
//!
//! Once per supervisor tick, candidate input files are pushed through an
//! ordered list of filter/limit/reorder steps to decide which to admit.
//! Steps are stateless between ticks and see only a read-only snapshot of
//! pipeline counters; the chain never touches the filesystem beyond `stat`
//! (and the `callable` delegate, which runs out of process).

mod chain;
mod state;
mod step;

pub use chain::Chain;
pub use state::PipelineState;
pub use step::{SortKey, StagingError, Step};
