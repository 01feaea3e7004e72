// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end specs.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const POLL_ENV: &[(&str, &str)] = &[
    ("TIGERFLOW_PIPELINE_POLL_INTERVAL", "1"),
    ("TIGERFLOW_TASK_POLL_INTERVAL", "1"),
];

pub struct PipelineFixture {
    pub root: tempfile::TempDir,
    pub config_file: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl PipelineFixture {
    pub fn new(config: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let input_dir = root.path().join("input");
        let output_dir = root.path().join("output");
        std::fs::create_dir_all(&input_dir).unwrap();
        std::fs::create_dir_all(&output_dir).unwrap();
        let config_file = root.path().join("pipeline.yml");
        std::fs::write(&config_file, config).unwrap();
        Self { root, config_file, input_dir, output_dir }
    }

    pub fn write_input(&self, name: &str, content: &str) {
        std::fs::write(self.input_dir.join(name), content).unwrap();
    }

    pub fn internal(&self) -> PathBuf {
        self.output_dir.join(".tigerflow")
    }

    pub fn finished(&self, name: &str) -> PathBuf {
        self.internal().join(".finished").join(name)
    }

    pub fn symlinks_dir(&self) -> PathBuf {
        self.internal().join(".symlinks")
    }

    /// Write an executable module script into the fixture root.
    pub fn write_module(&self, name: &str, content: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.root.path().join(name);
        std::fs::write(&path, content).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}

/// A supervisor child process, SIGKILLed on drop so failed tests don't
/// leak pipelines.
pub struct Supervisor {
    child: std::process::Child,
}

impl Supervisor {
    pub fn spawn(fx: &PipelineFixture) -> Self {
        let mut command = std::process::Command::new(tigerflow_bin());
        command
            .arg("run")
            .arg(&fx.config_file)
            .arg(&fx.input_dir)
            .arg(&fx.output_dir)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        for (key, value) in POLL_ENV {
            command.env(key, value);
        }
        let child = command.spawn().unwrap();
        Self { child }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn terminate(&self) {
        signal(self.pid(), "-TERM");
    }

    /// Wait for exit and return the raw exit code.
    pub fn wait_code(mut self) -> i32 {
        let deadline = Instant::now() + Duration::from_secs(60);
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status.code().unwrap_or(-1);
            }
            assert!(Instant::now() < deadline, "supervisor did not exit in time");
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.child.try_wait().map(|s| s.is_none()).unwrap_or(false) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

pub fn tigerflow_bin() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_tigerflow") {
        return PathBuf::from(path);
    }
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("tigerflow");
    path
}

pub fn signal(pid: u32, sig: &str) {
    let _ = std::process::Command::new("kill").args([sig, &pid.to_string()]).status();
}

/// Poll a predicate until it holds or the deadline passes.
pub fn wait_until(deadline: Duration, what: &str, predicate: impl Fn() -> bool) {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    panic!("timed out waiting for {what}");
}

pub fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).map(|mut entries| entries.next().is_none()).unwrap_or(false)
}
