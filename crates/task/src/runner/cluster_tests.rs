// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tf_slurm::FakeCluster;

fn cluster_config(input: &std::path::Path, output: &std::path::Path) -> ClusterConfig {
    ClusterConfig {
        runner: RunnerConfig {
            task_name: "transcribe".to_string(),
            input_dir: input.to_path_buf(),
            input_ext: ".txt".to_string(),
            output_dir: output.to_path_buf(),
            output_ext: ".out".to_string(),
            poll_interval: Duration::from_millis(20),
        },
        account: "research".to_string(),
        max_workers: 2,
        resources: WorkerResources {
            cpus: 1,
            gpus: None,
            memory: "2G".to_string(),
            time: "01:00:00".to_string(),
            sbatch_options: vec![],
        },
        setup_commands: vec![],
        worker_command: "tftask --run-worker".to_string(),
        scale_interval: Duration::from_millis(40),
        scale_wait_count: 3,
        worker_startup_timeout: Duration::from_secs(600),
    }
}

async fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) {
    tokio::time::timeout(deadline, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("condition not reached in {deadline:?}"));
}

#[tokio::test]
async fn dispatch_claims_each_stem_for_one_worker() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a.txt"), "x").unwrap();
    std::fs::write(input.path().join("b.txt"), "x").unwrap();

    let client = Arc::new(FakeCluster::default());
    let runner = ClusterRunner::new(Arc::clone(&client), cluster_config(input.path(), output.path()));
    let token = runner.shutdown_token();
    let handle = tokio::spawn(runner.run());

    let spool = output.path().join(SPOOL_DIR);
    wait_until(Duration::from_secs(5), {
        let spool = spool.clone();
        move || {
            let claims = claim_files(&spool);
            claims.len() == 2
        }
    })
    .await;

    // Worker scripts were submitted with the worker-mode flags.
    let scripts = client.submitted_scripts();
    assert!(!scripts.is_empty());
    assert!(scripts[0].contains("#SBATCH --job-name=transcribe-worker"));
    assert!(scripts[0].contains("tftask --run-worker --worker-id w0 --spool-dir"));

    // Each stem is claimed by exactly one worker.
    let claims = claim_files(&spool);
    let names: Vec<_> =
        claims.iter().map(|c| c.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(claims.len(), 2);
    assert!(names.contains(&"a.txt".to_string()));
    assert!(names.contains(&"b.txt".to_string()));

    token.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn completed_outputs_release_handles_and_claims() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a.txt"), "x").unwrap();

    let client = Arc::new(FakeCluster::default());
    let runner = ClusterRunner::new(Arc::clone(&client), cluster_config(input.path(), output.path()));
    let token = runner.shutdown_token();
    let handle = tokio::spawn(runner.run());

    let spool = output.path().join(SPOOL_DIR);
    wait_until(Duration::from_secs(5), {
        let spool = spool.clone();
        move || claim_files(&spool).len() == 1
    })
    .await;

    // Play the worker: produce the output.
    std::fs::write(output.path().join("a.out"), "done").unwrap();

    wait_until(Duration::from_secs(5), {
        let spool = spool.clone();
        move || claim_files(&spool).is_empty()
    })
    .await;

    token.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn idle_workers_are_released_after_the_threshold() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a.txt"), "x").unwrap();

    let client = Arc::new(FakeCluster::default());
    let runner = ClusterRunner::new(Arc::clone(&client), cluster_config(input.path(), output.path()));
    let token = runner.shutdown_token();
    let handle = tokio::spawn(runner.run());

    // Let it dispatch, then complete the work so the worker goes idle.
    let spool = output.path().join(SPOOL_DIR);
    wait_until(Duration::from_secs(5), {
        let spool = spool.clone();
        move || claim_files(&spool).len() == 1
    })
    .await;
    std::fs::write(output.path().join("a.out"), "done").unwrap();

    // Idle checks accumulate; the worker job gets cancelled.
    wait_until(Duration::from_secs(5), {
        let client = Arc::clone(&client);
        move || !client.cancelled().is_empty()
    })
    .await;

    token.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_cancels_outstanding_workers() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a.txt"), "x").unwrap();

    let client = Arc::new(FakeCluster::default());
    let runner = ClusterRunner::new(Arc::clone(&client), cluster_config(input.path(), output.path()));
    let token = runner.shutdown_token();
    let handle = tokio::spawn(runner.run());

    wait_until(Duration::from_secs(5), {
        let client = Arc::clone(&client);
        move || !client.submitted_scripts().is_empty()
    })
    .await;

    token.cancel();
    handle.await.unwrap().unwrap();
    assert!(!client.cancelled().is_empty());
}

#[tokio::test]
async fn failed_submission_does_not_kill_the_loop() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a.txt"), "x").unwrap();

    let client = Arc::new(FakeCluster::default());
    client.fail_submissions();
    let runner = ClusterRunner::new(Arc::clone(&client), cluster_config(input.path(), output.path()));
    let token = runner.shutdown_token();
    let handle = tokio::spawn(runner.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    // The loop survived repeated submit failures.
    handle.await.unwrap().unwrap();
}

fn claim_files(spool: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut claims = Vec::new();
    let Ok(workers) = std::fs::read_dir(spool) else {
        return claims;
    };
    for worker in workers.flatten() {
        if let Ok(entries) = std::fs::read_dir(worker.path()) {
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    claims.push(entry.path());
                }
            }
        }
    }
    claims
}
