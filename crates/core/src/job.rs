// SPDX-License-Identifier: MIT

//! The subset of the job/device domain the dispatcher core observes.
//!
//! The full job and device schema lives in the persistent store (§6.2 of the
//! spec is explicit that the schema itself is out of scope); this module
//! models only the fields the core reads or writes.

use crate::ids::{Hostname, JobId};
use serde::{Deserialize, Serialize};

/// Job lifecycle states (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    Running,
    Canceling,
    Complete,
    Incomplete,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Incomplete | JobStatus::Canceled)
    }
}

/// A physical or virtual test target, owned by exactly one worker host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub hostname: String,
    pub worker_host: Option<Hostname>,
}

impl Device {
    /// Render the device configuration for a job context. Template rendering
    /// itself is an out-of-scope external collaborator (spec §1); this is a
    /// minimal passthrough placeholder that a real deployment replaces with
    /// its templating engine.
    pub fn load_device_configuration(&self, context: &str) -> String {
        format!("device: {}\ncontext: {}\n", self.hostname, context)
    }
}

/// The subset of a Job the dispatcher core observes (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub is_pipeline: bool,
    pub is_multinode: bool,
    pub dynamic_connection: bool,
    pub actual_device: Option<Device>,
    pub requested_device: Option<Device>,
    pub definition: String,
    pub pipeline_compatibility: String,
    pub output_dir: std::path::PathBuf,
    pub sub_jobs: Vec<JobId>,
    pub parent_job: Option<JobId>,
    /// Only meaningful when `dynamic_connection` is set: the worker this
    /// sub-job shares a connection with, independent of any device.
    pub lookup_worker: Option<Hostname>,
    pub priority: i32,
    pub health_check: bool,
    pub target_group: String,
    pub submit_order: u64,
}

impl Job {
    pub fn worker_host(&self) -> Option<&Hostname> {
        if self.dynamic_connection {
            self.lookup_worker.as_ref()
        } else {
            self.actual_device.as_ref().and_then(|d| d.worker_host.as_ref())
        }
    }
}
