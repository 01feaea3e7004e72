// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::os::unix::fs::PermissionsExt;
use tf_slurm::FakeCluster;

/// Executable stand-in for a task module: exits 0 for the `--help`
/// probe and immediately when launched.
fn fake_module(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

struct Fixture {
    _config_dir: tempfile::TempDir,
    input_dir: tempfile::TempDir,
    output_dir: tempfile::TempDir,
    config_file: PathBuf,
}

fn fixture(config_body: impl FnOnce(&Path) -> String) -> Fixture {
    let config_dir = tempfile::tempdir().unwrap();
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let config_file = config_dir.path().join("pipeline.yml");
    std::fs::write(&config_file, config_body(config_dir.path())).unwrap();
    Fixture { _config_dir: config_dir, input_dir, output_dir, config_file }
}

fn two_stage_yaml(dir: &Path) -> String {
    let module = fake_module(dir, "module.sh");
    format!(
        r#"
tasks:
  - name: ingest
    kind: local
    module: {module}
    input_ext: .txt
    output_ext: .out
    keep_output: false
  - name: count
    kind: local
    module: {module}
    input_ext: .out
    output_ext: .json
    depends_on: ingest
"#,
        module = module.display()
    )
}

fn options(fx: &Fixture) -> PipelineOptions {
    PipelineOptions {
        config_file: fx.config_file.clone(),
        input_dir: fx.input_dir.path().to_path_buf(),
        output_dir: fx.output_dir.path().to_path_buf(),
        delete_input: false,
        idle_timeout: None,
    }
}

async fn prepare(fx: &Fixture) -> Pipeline<FakeCluster> {
    Pipeline::prepare_with(options(fx), Settings::default(), Arc::new(FakeCluster::default()))
        .await
        .unwrap()
}

#[tokio::test]
async fn second_instance_is_refused_while_first_holds_the_lock() {
    let fx = fixture(two_stage_yaml);
    let first = prepare(&fx).await;

    let err = Pipeline::prepare_with(
        options(&fx),
        Settings::default(),
        Arc::new(FakeCluster::default()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::AlreadyRunning(_)));

    // Releasing the first instance frees the lock.
    drop(first);
    prepare(&fx).await;
}

#[tokio::test]
async fn stale_pid_record_is_cleaned_and_ignored() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());
    std::fs::create_dir_all(ws.internal_dir()).unwrap();
    std::fs::write(ws.pid_file(), "4194000").unwrap();

    let pipeline = prepare(&fx).await;
    assert_eq!(
        tf_core::read_pid_file(&ws.pid_file()),
        Some(std::process::id() as i32)
    );
    drop(pipeline);
}

#[tokio::test]
async fn staging_respects_the_admission_cap() {
    let fx = fixture(|dir| {
        let mut yaml = two_stage_yaml(dir);
        yaml.push_str(
            "staging:\n  steps:\n    - kind: sort_by\n      key: name\n    - kind: max_staged\n      count: 3\n",
        );
        yaml
    });

    // Two files already staged before startup.
    let ws = Workspace::new(fx.output_dir.path());
    std::fs::create_dir_all(ws.symlinks_dir()).unwrap();
    for name in ["old1.txt", "old2.txt"] {
        let source = fx.input_dir.path().join(name);
        std::fs::write(&source, "x").unwrap();
        std::os::unix::fs::symlink(&source, ws.symlinks_dir().join(name)).unwrap();
    }
    // Five fresh candidates.
    for i in 0..5 {
        std::fs::write(fx.input_dir.path().join(format!("new{i}.txt")), "x").unwrap();
    }

    let mut pipeline = prepare(&fx).await;
    pipeline.stage_new_files();

    // max(0, 3 - 2) = 1 admission.
    assert_eq!(count_entries(&ws.symlinks_dir()), 3);
}

#[tokio::test]
async fn staged_files_are_not_restaged() {
    let fx = fixture(two_stage_yaml);
    std::fs::write(fx.input_dir.path().join("a.txt"), "x").unwrap();

    let ws = Workspace::new(fx.output_dir.path());
    let mut pipeline = prepare(&fx).await;
    pipeline.stage_new_files();
    assert_eq!(count_entries(&ws.symlinks_dir()), 1);

    pipeline.stage_new_files();
    assert_eq!(count_entries(&ws.symlinks_dir()), 1);
}

#[tokio::test]
async fn completion_harvest_retires_the_stem() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());

    let source = fx.input_dir.path().join("a.txt");
    std::fs::write(&source, "x").unwrap();

    let mut pipeline = prepare(&fx).await;
    pipeline.stage_new_files();

    // Both stages produced their outputs ("count" is the only terminal).
    std::fs::write(ws.task_dir("ingest").join("a.out"), "mid").unwrap();
    std::fs::write(ws.task_dir("count").join("a.json"), "42").unwrap();

    pipeline.process_completed_files();

    assert!(ws.finished_dir().join("a.txt").exists());
    assert!(!ws.symlinks_dir().join("a.txt").exists());
    // keep_output=false drops the intermediate; keep_output=true promotes.
    assert!(!ws.task_dir("ingest").join("a.out").exists());
    assert!(!ws.task_dir("count").join("a.json").exists());
    assert_eq!(
        std::fs::read_to_string(ws.public_task_dir("count").join("a.json")).unwrap(),
        "42"
    );
    // The original input is untouched without --delete-input.
    assert!(source.exists());
}

#[tokio::test]
async fn incomplete_stems_are_not_harvested() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());
    std::fs::write(fx.input_dir.path().join("a.txt"), "x").unwrap();

    let mut pipeline = prepare(&fx).await;
    pipeline.stage_new_files();

    // Only the first stage finished; the terminal task has not.
    std::fs::write(ws.task_dir("ingest").join("a.out"), "mid").unwrap();
    pipeline.process_completed_files();

    assert!(!ws.finished_dir().join("a.txt").exists());
    assert!(ws.symlinks_dir().join("a.txt").exists());
    assert!(ws.task_dir("ingest").join("a.out").exists());
}

#[tokio::test]
async fn failed_stems_stay_staged() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());
    std::fs::write(fx.input_dir.path().join("z.txt"), "x").unwrap();

    let mut pipeline = prepare(&fx).await;
    pipeline.stage_new_files();
    std::fs::write(ws.task_dir("ingest").join("z.err"), "boom").unwrap();

    pipeline.report_failed_files();
    pipeline.process_completed_files();

    assert!(ws.symlinks_dir().join("z.txt").exists());
    assert!(!ws.finished_dir().join("z.txt").exists());
}

#[tokio::test]
async fn error_reports_are_counted_once() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());
    let mut pipeline = prepare(&fx).await;

    std::fs::write(ws.task_dir("ingest").join("a.err"), "boom").unwrap();
    pipeline.report_failed_files();
    pipeline.report_failed_files();

    assert_eq!(pipeline.task_error_files["ingest"].len(), 1);
}

#[tokio::test]
async fn delete_input_removes_source_on_completion() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());
    let source = fx.input_dir.path().join("a.txt");
    std::fs::write(&source, "x").unwrap();

    let mut opts = options(&fx);
    opts.delete_input = true;
    let mut pipeline =
        Pipeline::prepare_with(opts, Settings::default(), Arc::new(FakeCluster::default()))
            .await
            .unwrap();
    pipeline.stage_new_files();
    std::fs::write(ws.task_dir("ingest").join("a.out"), "mid").unwrap();
    std::fs::write(ws.task_dir("count").join("a.json"), "42").unwrap();

    pipeline.process_completed_files();

    assert!(!source.exists());
    assert!(ws.finished_dir().join("a.txt").exists());
}

#[tokio::test]
async fn idle_timeout_ends_the_run_cleanly() {
    let fx = fixture(two_stage_yaml);
    let ws = Workspace::new(fx.output_dir.path());

    let mut opts = options(&fx);
    opts.idle_timeout = Some(Duration::ZERO);
    let pipeline =
        Pipeline::prepare_with(opts, Settings::default(), Arc::new(FakeCluster::default()))
            .await
            .unwrap();

    let outcome = pipeline.run().await.unwrap();
    assert!(outcome.idle_timed_out);
    assert_eq!(outcome.signal, None);
    assert_eq!(outcome.exit_code(), 0);
    assert!(!ws.pid_file().exists(), "PID record must be removed on exit");
}

#[tokio::test]
async fn cluster_tasks_are_submitted_with_a_client_script() {
    let fx = fixture(|dir| {
        let module = fake_module(dir, "module.sh");
        format!(
            r#"
tasks:
  - name: transcribe
    kind: slurm
    module: {module}
    input_ext: .txt
    output_ext: .json
    account: research
    max_workers: 4
    worker_resources:
      cpus: 2
      memory: 8G
      time: "01:00:00"
"#,
            module = module.display()
        )
    });

    let client = Arc::new(FakeCluster::default());
    let mut pipeline =
        Pipeline::prepare_with(options(&fx), Settings::default(), Arc::clone(&client))
            .await
            .unwrap();
    pipeline.start_tasks().await.unwrap();

    let scripts = client.submitted_scripts();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains("#SBATCH --job-name=transcribe-client"));
    assert!(scripts[0].contains("--run-directly"));
}
