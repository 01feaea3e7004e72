// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-memory cluster for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{ClusterClient, JobId};
use crate::error::SlurmError;
use crate::status::TaskStatus;

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    scripts: Vec<String>,
    statuses: HashMap<String, TaskStatus>,
    cancelled: Vec<JobId>,
    fail_submit: bool,
}

/// In-memory [`ClusterClient`]: submissions get incrementing IDs, statuses
/// are whatever the test scripted, cancels are recorded.
#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    /// Make subsequent submissions fail.
    pub fn fail_submissions(&self) {
        self.state.lock().fail_submit = true;
    }

    /// Script the status returned for a client job name.
    pub fn set_status(&self, client_job_name: &str, status: TaskStatus) {
        self.state.lock().statuses.insert(client_job_name.to_string(), status);
    }

    /// Every script submitted so far, in order.
    pub fn submitted_scripts(&self) -> Vec<String> {
        self.state.lock().scripts.clone()
    }

    /// Every job ID cancelled so far, in order.
    pub fn cancelled(&self) -> Vec<JobId> {
        self.state.lock().cancelled.clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn submit(&self, script: &str) -> Result<JobId, SlurmError> {
        let mut state = self.state.lock();
        if state.fail_submit {
            return Err(SlurmError::NoJobId { output: "submission disabled".to_string() });
        }
        state.next_id += 1;
        state.scripts.push(script.to_string());
        Ok(JobId(state.next_id))
    }

    async fn status(
        &self,
        client_job_name: &str,
        _worker_job_name: &str,
    ) -> Result<TaskStatus, SlurmError> {
        Ok(self
            .state
            .lock()
            .statuses
            .get(client_job_name)
            .cloned()
            .unwrap_or_else(|| TaskStatus::inactive(None)))
    }

    async fn cancel(&self, job_id: JobId) -> Result<(), SlurmError> {
        self.state.lock().cancelled.push(job_id);
        Ok(())
    }
}
