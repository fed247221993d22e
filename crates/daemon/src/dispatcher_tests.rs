// SPDX-License-Identifier: MIT

use super::*;
use dispatcher_core::{Device, JobStatus};
use dispatcher_store::InMemoryStore;

struct AllOnline;
impl WorkerLiveness for AllOnline {
    fn is_online(&self, _hostname: &Hostname) -> bool {
        true
    }
}

fn submitted_job(id: u64, priority: i32, order: u64, host: &str) -> Job {
    Job {
        id: JobId::new(id),
        status: JobStatus::Submitted,
        is_pipeline: true,
        is_multinode: false,
        dynamic_connection: false,
        actual_device: None,
        requested_device: Some(Device { hostname: "panda01".into(), worker_host: Some(Hostname::new(host)) }),
        definition: "job_name: smoke".to_string(),
        pipeline_compatibility: "1".to_string(),
        output_dir: "/tmp".into(),
        sub_jobs: vec![],
        parent_job: None,
        lookup_worker: None,
        priority,
        health_check: false,
        target_group: String::new(),
        submit_order: order,
    }
}

fn empty_config() -> DispatchConfig {
    DispatchConfig { env_path: None, env_dut_path: None, dispatchers_config_dir: None }
}

#[tokio::test]
async fn assigns_submitted_job_and_sends_start() {
    let store = InMemoryStore::new();
    store.seed(submitted_job(1, 0, 0, "worker-1"));

    let outbox = Dispatcher::assign_submitted(&store, &AllOnline, &empty_config()).await;

    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, Hostname::new("worker-1"));
    assert!(matches!(outbox[0].msg, OutboundMsg::Start { job_id, .. } if job_id == JobId::new(1)));
}

#[tokio::test]
async fn job_with_device_but_no_worker_host_is_marked_incomplete() {
    let store = InMemoryStore::new();
    let mut job = submitted_job(1, 0, 0, "worker-1");
    job.requested_device = Some(Device { hostname: "panda01".into(), worker_host: None });
    store.seed(job);

    let outbox = Dispatcher::assign_submitted(&store, &AllOnline, &empty_config()).await;

    assert!(outbox.is_empty());
    assert_eq!(store.get_job(JobId::new(1)).await.unwrap().status, JobStatus::Incomplete);
}

#[tokio::test]
async fn invalid_definition_marks_job_incomplete_without_affecting_others() {
    let store = InMemoryStore::new();
    let mut bad = submitted_job(1, 0, 0, "worker-1");
    bad.definition = "{unterminated".to_string();
    store.seed(bad);
    store.seed(submitted_job(2, 0, 1, "worker-2"));

    let outbox = Dispatcher::assign_submitted(&store, &AllOnline, &empty_config()).await;

    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, Hostname::new("worker-2"));
    assert_eq!(store.get_job(JobId::new(1)).await.unwrap().status, JobStatus::Incomplete);
}

#[tokio::test]
async fn cancels_propagate_to_resolved_worker() {
    let store = InMemoryStore::new();
    let mut job = submitted_job(1, 0, 0, "worker-1");
    job.status = JobStatus::Canceling;
    job.actual_device = job.requested_device.take();
    store.seed(job);

    let outbox = Dispatcher::propagate_cancellations(&store).await;

    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].msg, OutboundMsg::Cancel { job_id: JobId::new(1) });
}

#[tokio::test]
async fn cancel_with_no_resolvable_worker_finalises_immediately() {
    let store = InMemoryStore::new();
    let mut job = submitted_job(1, 0, 0, "worker-1");
    job.status = JobStatus::Canceling;
    job.actual_device = None;
    job.requested_device = None;
    store.seed(job);

    let outbox = Dispatcher::propagate_cancellations(&store).await;

    assert!(outbox.is_empty());
    assert_eq!(store.get_job(JobId::new(1)).await.unwrap().status, JobStatus::Canceled);
}

#[test]
fn export_definition_injects_compatibility() {
    let job = submitted_job(1, 0, 0, "worker-1");
    let out = export_definition(&job).unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
    assert_eq!(parsed["compatibility"].as_str(), Some("1"));
    assert_eq!(parsed["job_name"].as_str(), Some("smoke"));
}
