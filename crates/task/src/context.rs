// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-phase setup context.
//!
//! The context is writable while the task's `setup` callback runs, then
//! frozen for the rest of the process lifetime: `run` and `teardown` only
//! read it. Freezing is an invariant about lifetime phases, enforced at
//! runtime with a diagnostic rather than by the type system, so the same
//! value can be threaded through the whole task without re-wrapping.

use std::any::Any;
use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("setup context is frozen; values can only be inserted during setup")]
    Frozen,
}

/// Key-value bag populated during setup and read-only afterwards.
#[derive(Default)]
pub struct SetupContext {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
    frozen: bool,
}

impl SetupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value. Fails once the context is frozen.
    pub fn insert<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), ContextError> {
        if self.frozen {
            return Err(ContextError::Frozen);
        }
        self.values.insert(key.into(), Box::new(value));
        Ok(())
    }

    /// Fetch a value by key and type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Make the context read-only.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl std::fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupContext")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("frozen", &self.frozen)
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
