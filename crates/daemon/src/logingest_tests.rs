// SPDX-License-Identifier: MIT

use super::*;
use dispatcher_core::{Device, FakeClock, Job, JobStatus};
use dispatcher_store::InMemoryStore;
use std::time::Duration;
use tempfile::tempdir;

fn job(id: u64, output_dir: std::path::PathBuf) -> Job {
    Job {
        id: JobId::new(id),
        status: JobStatus::Running,
        is_pipeline: true,
        is_multinode: false,
        dynamic_connection: false,
        actual_device: Some(Device { hostname: "panda01".into(), worker_host: None }),
        requested_device: None,
        definition: String::new(),
        pipeline_compatibility: String::new(),
        output_dir,
        sub_jobs: vec![],
        parent_job: None,
        lookup_worker: None,
        priority: 0,
        health_check: false,
        target_group: String::new(),
        submit_order: 0,
    }
}

fn frame(job_id: u64, level: &str, name: &str, message: &str) -> LogFrame {
    LogFrame { job_id: JobId::new(job_id), level: level.into(), name: name.into(), message: message.into() }
}

#[tokio::test]
async fn writes_to_main_and_rotated_sub_sink() {
    let dir = tempdir().unwrap();
    let store = InMemoryStore::new();
    store.seed(job(1, dir.path().to_path_buf()));
    let mut ingest = LogIngest::new(FakeClock::new());

    ingest.process_frame(frame(1, "1.2", "foo", "{lvl: info, msg: a}"), &store).await;
    ingest.process_frame(frame(1, "1.3", "bar", "{lvl: info, msg: b}"), &store).await;

    let main = std::fs::read_to_string(dir.path().join("output.yaml")).unwrap();
    assert!(main.contains("a") && main.contains("b"));

    let first = std::fs::read_to_string(dir.path().join("pipeline/1/1.2-foo.yaml")).unwrap();
    assert!(first.contains("a"));
    let second = std::fs::read_to_string(dir.path().join("pipeline/1/1.3-bar.yaml")).unwrap();
    assert!(second.contains("b"));
}

#[tokio::test]
async fn rejects_path_traversal_in_level() {
    let dir = tempdir().unwrap();
    let store = InMemoryStore::new();
    store.seed(job(1, dir.path().to_path_buf()));
    let mut ingest = LogIngest::new(FakeClock::new());

    ingest.process_frame(frame(1, "../evil", "x", "{lvl: info, msg: x}"), &store).await;

    assert!(!dir.path().join("output.yaml").exists());
    assert_eq!(ingest.open_job_count(), 0);
}

#[tokio::test]
async fn drops_frame_for_unknown_job() {
    let store = InMemoryStore::new();
    let mut ingest = LogIngest::new(FakeClock::new());

    ingest.process_frame(frame(404, "1.0", "x", "{lvl: info, msg: x}"), &store).await;

    assert_eq!(ingest.open_job_count(), 0);
}

#[tokio::test]
async fn drops_malformed_record() {
    let dir = tempdir().unwrap();
    let store = InMemoryStore::new();
    store.seed(job(1, dir.path().to_path_buf()));
    let mut ingest = LogIngest::new(FakeClock::new());

    ingest.process_frame(frame(1, "1.0", "x", "not a mapping with lvl"), &store).await;

    assert_eq!(ingest.open_job_count(), 0);
}

#[tokio::test]
async fn reap_idle_closes_stale_handles() {
    let dir = tempdir().unwrap();
    let store = InMemoryStore::new();
    store.seed(job(1, dir.path().to_path_buf()));
    let clock = FakeClock::new();
    let mut ingest = LogIngest::new(clock.clone());

    ingest.process_frame(frame(1, "1.0", "x", "{lvl: info, msg: x}"), &store).await;
    assert_eq!(ingest.open_job_count(), 1);

    clock.advance(Duration::from_secs(61));
    let config = MasterConfig::default();
    ingest.reap_idle(&config);
    assert_eq!(ingest.open_job_count(), 0);
}
