// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-derived settings.
//!
//! All tunables carry the `TIGERFLOW_` prefix. `TIGERFLOW_ENV_FILE` may
//! point at a dotenv file that is loaded first; real environment variables
//! override values from the file. The record is built once at startup and
//! passed explicitly; nothing re-reads the environment at use-sites.

use std::time::Duration;

use thiserror::Error;

const ENV_FILE_VAR: &str = "TIGERFLOW_ENV_FILE";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid { var: &'static str, value: String, reason: &'static str },
}

/// Immutable runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Timeout for validating task launch targets with a `--help` probe.
    pub task_validation_timeout: Duration,
    /// Supervisor tick interval.
    pub pipeline_poll_interval: Duration,
    /// Task-runtime scan interval.
    pub task_poll_interval: Duration,
    /// Wall-time cap in hours for each cluster client job.
    pub slurm_client_hours: u64,
    /// Interval between cluster autoscaling checks.
    pub slurm_scale_interval: Duration,
    /// Consecutive idle checks before a cluster worker is released.
    pub slurm_scale_wait_count: u32,
    /// Timeout for a cluster worker to initialize.
    pub slurm_worker_startup_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            task_validation_timeout: Duration::from_secs(60),
            pipeline_poll_interval: Duration::from_secs(10),
            task_poll_interval: Duration::from_secs(3),
            slurm_client_hours: 24,
            slurm_scale_interval: Duration::from_secs(15),
            slurm_scale_wait_count: 8,
            slurm_worker_startup_timeout: Duration::from_secs(600),
        }
    }
}

impl Settings {
    /// Load settings from the environment (after applying the env file).
    pub fn load() -> Result<Self, SettingsError> {
        match std::env::var(ENV_FILE_VAR) {
            Ok(path) => {
                // Missing file named explicitly is ignored, like the default.
                let _ = dotenvy::from_path(&path);
            }
            Err(_) => {
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_env()
    }

    /// Read settings from already-populated environment variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = Self::default();
        let client_hours =
            env_u64("TIGERFLOW_SLURM_TASK_CLIENT_HOURS", defaults.slurm_client_hours)?;
        if client_hours >= 100 {
            return Err(SettingsError::Invalid {
                var: "TIGERFLOW_SLURM_TASK_CLIENT_HOURS",
                value: client_hours.to_string(),
                reason: "must be below 100",
            });
        }
        Ok(Self {
            task_validation_timeout: env_secs(
                "TIGERFLOW_TASK_VALIDATION_TIMEOUT",
                defaults.task_validation_timeout,
            )?,
            pipeline_poll_interval: env_secs(
                "TIGERFLOW_PIPELINE_POLL_INTERVAL",
                defaults.pipeline_poll_interval,
            )?,
            task_poll_interval: env_secs(
                "TIGERFLOW_TASK_POLL_INTERVAL",
                defaults.task_poll_interval,
            )?,
            slurm_client_hours: client_hours,
            slurm_scale_interval: env_secs(
                "TIGERFLOW_SLURM_TASK_SCALE_INTERVAL",
                defaults.slurm_scale_interval,
            )?,
            slurm_scale_wait_count: env_u64(
                "TIGERFLOW_SLURM_TASK_SCALE_WAIT_COUNT",
                u64::from(defaults.slurm_scale_wait_count),
            )? as u32,
            slurm_worker_startup_timeout: env_secs(
                "TIGERFLOW_SLURM_TASK_WORKER_STARTUP_TIMEOUT",
                defaults.slurm_worker_startup_timeout,
            )?,
        })
    }
}

fn env_u64(var: &'static str, default: u64) -> Result<u64, SettingsError> {
    match std::env::var(var) {
        Ok(raw) => {
            let value = raw.trim().parse::<u64>().map_err(|_| SettingsError::Invalid {
                var,
                value: raw.clone(),
                reason: "not a positive integer",
            })?;
            if value == 0 {
                return Err(SettingsError::Invalid {
                    var,
                    value: raw,
                    reason: "must be greater than zero",
                });
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

fn env_secs(var: &'static str, default: Duration) -> Result<Duration, SettingsError> {
    Ok(Duration::from_secs(env_u64(var, default.as_secs())?))
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
