// SPDX-License-Identifier: MIT

//! The `Store` trait (spec §6.2): the dispatch loop's only window onto
//! persisted job/device state. Every multi-statement operation here is
//! documented as running inside a transaction with row-level write locks on
//! the affected job rows — a guarantee this crate's in-memory implementation
//! upholds with a single process-wide mutex (spec §5 "Shared resources").

use async_trait::async_trait;
use dispatcher_core::{Device, Hostname, Job, JobId, JobStatus};

use crate::error::StoreError;

/// Worker liveness, as seen by the registry. `select_device` needs this to
/// avoid picking a device whose worker host is offline.
pub trait WorkerLiveness: Send + Sync {
    fn is_online(&self, hostname: &Hostname) -> bool;
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_job(&self, id: JobId) -> Option<Job>;

    /// Re-read a job, e.g. after a scheduler call may have mutated it
    /// (spec §4.4 step 2).
    async fn reload(&self, id: JobId) -> Option<Job> {
        self.get_job(id).await
    }

    async fn jobs_for_worker(&self, hostname: &Hostname, running_pipeline: bool) -> Vec<Job>;

    /// Ordered by `(health_check DESC, priority DESC, submit_time ASC,
    /// target_group ASC, id ASC)` (spec §4.4 Phase 1).
    async fn jobs_submitted_pipeline_with_device(&self) -> Vec<Job>;

    async fn jobs_canceling_pipeline(&self) -> Vec<Job>;

    /// Confirm or choose a device for `job`, given current worker liveness.
    /// Returns `None` if no device is available — the caller skips the job.
    async fn select_device(&self, job_id: JobId, liveness: &dyn WorkerLiveness) -> Option<Device>;

    async fn create_job(&self, job_id: JobId, device: Device) -> Result<(), StoreError>;

    async fn start_job(&self, job_id: JobId) -> Result<(), StoreError>;

    async fn cancel_job(&self, job_id: JobId) -> Result<(), StoreError>;

    async fn fail_job(&self, job_id: JobId, msg: &str, status: JobStatus) -> Result<(), StoreError>;

    /// Parse the job's `description.yaml` (already written to disk by the
    /// caller) into the store's structured representation.
    async fn parse_job_description(&self, job_id: JobId) -> Result<(), StoreError>;

    /// Returns the metadata filename the results extractor should use.
    async fn create_metadata_store(&self, msg: &str, job_id: JobId, level: &str) -> Result<String, StoreError>;

    /// Returns `false` if the results could not be mapped (logged by the
    /// caller at `warn`, not an error per spec §4.2 step 4).
    async fn map_scanned_results(&self, results: &str, job_id: JobId, meta_filename: &str) -> bool;
}
