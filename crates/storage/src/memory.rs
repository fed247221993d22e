// SPDX-License-Identifier: MIT

//! Reference [`Store`] implementation backed by an in-process map. Useful for
//! tests and for the daemon's demo/standalone mode; a real deployment backs
//! the trait with its own database instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dispatcher_core::{Device, Hostname, Job, JobId, JobStatus};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::store::{Store, WorkerLiveness};

#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<HashMap<JobId, Job>>,
    submit_counter: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job, for test setup. Assigns the next submit
    /// order if the job doesn't already carry one worth preserving.
    pub fn seed(&self, job: Job) {
        self.jobs.lock().insert(job.id, job);
    }

    pub fn next_submit_order(&self) -> u64 {
        self.submit_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn with_job_mut<T>(&self, id: JobId, f: impl FnOnce(&mut Job) -> T) -> Result<T, StoreError> {
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id.0))?;
        Ok(f(job))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_job(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().get(&id).cloned()
    }

    async fn jobs_for_worker(&self, hostname: &Hostname, running_pipeline: bool) -> Vec<Job> {
        self.jobs
            .lock()
            .values()
            .filter(|j| {
                let on_worker = j.worker_host() == Some(hostname);
                let status_matches = if running_pipeline {
                    j.is_pipeline && j.status == JobStatus::Running
                } else {
                    !j.status.is_terminal()
                };
                on_worker && status_matches
            })
            .cloned()
            .collect()
    }

    async fn jobs_submitted_pipeline_with_device(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .lock()
            .values()
            .filter(|j| j.is_pipeline && j.status == JobStatus::Submitted && j.requested_device.is_some())
            .cloned()
            .collect();
        // (health_check DESC, priority DESC, submit_time ASC, target_group ASC, id ASC)
        jobs.sort_by(|a, b| {
            b.health_check
                .cmp(&a.health_check)
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.submit_order.cmp(&b.submit_order))
                .then_with(|| a.target_group.cmp(&b.target_group))
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    async fn jobs_canceling_pipeline(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .values()
            .filter(|j| j.is_pipeline && j.status == JobStatus::Canceling)
            .cloned()
            .collect()
    }

    async fn select_device(&self, job_id: JobId, liveness: &dyn WorkerLiveness) -> Option<Device> {
        let jobs = self.jobs.lock();
        let job = jobs.get(&job_id)?;
        let device = job.requested_device.clone().or_else(|| job.actual_device.clone())?;
        match &device.worker_host {
            Some(host) if liveness.is_online(host) => Some(device),
            Some(_) => None,
            None => Some(device),
        }
    }

    async fn create_job(&self, job_id: JobId, device: Device) -> Result<(), StoreError> {
        self.with_job_mut(job_id, |job| {
            job.actual_device = Some(device);
            job.status = JobStatus::Submitted;
        })
    }

    async fn start_job(&self, job_id: JobId) -> Result<(), StoreError> {
        self.with_job_mut(job_id, |job| job.status = JobStatus::Running)
    }

    async fn cancel_job(&self, job_id: JobId) -> Result<(), StoreError> {
        self.with_job_mut(job_id, |job| job.status = JobStatus::Canceled)
    }

    async fn fail_job(&self, job_id: JobId, msg: &str, status: JobStatus) -> Result<(), StoreError> {
        self.with_job_mut(job_id, |job| {
            job.status = status;
            job.pipeline_compatibility = msg.to_string();
        })
    }

    async fn parse_job_description(&self, job_id: JobId) -> Result<(), StoreError> {
        self.jobs
            .lock()
            .get(&job_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(job_id.0))
    }

    async fn create_metadata_store(&self, _msg: &str, job_id: JobId, level: &str) -> Result<String, StoreError> {
        Ok(format!("{}-{}.yaml", job_id, level))
    }

    async fn map_scanned_results(&self, results: &str, _job_id: JobId, _meta_filename: &str) -> bool {
        !results.trim().is_empty()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
