// SPDX-License-Identifier: MIT

//! The control-plane request/reply handler (spec §4.3, §6.3). Runs on the
//! main context alongside the Dispatcher and Registry (spec §5).

use dispatcher_core::{Clock, Hostname, JobId, JobStatus, MasterConfig};
use dispatcher_store::Store;
use dispatcher_wire::{InboundMsg, OutboundMsg};

use crate::registry::{HelloKind, Registry, RestartOutcome};

pub struct ControlPlane<C: Clock> {
    pub registry: Registry<C>,
}

impl<C: Clock> ControlPlane<C> {
    pub fn new(registry: Registry<C>) -> Self {
        Self { registry }
    }

    /// Handle one inbound frame from `hostname`. Returns the reply to send
    /// back to that worker, or `None` if the protocol says not to reply
    /// (spec §4.3: malformed frames, version mismatch, `START_OK`).
    pub async fn handle(
        &mut self,
        hostname: &Hostname,
        msg: InboundMsg,
        store: &dyn Store,
    ) -> Option<OutboundMsg> {
        match msg {
            InboundMsg::Hello { version } => {
                if version != dispatcher_core::PROTOCOL_VERSION {
                    tracing::error!(%hostname, version, "protocol version mismatch on HELLO");
                    return None;
                }
                tracing::info!(%hostname, "HELLO");
                let outcome = self.registry.note_restart(hostname, HelloKind::Hello);
                if outcome == RestartOutcome::Restarted {
                    self.cancel_running_jobs(hostname, store).await;
                }
                Some(OutboundMsg::HelloOk)
            }
            InboundMsg::HelloRetry { version } => {
                if version != dispatcher_core::PROTOCOL_VERSION {
                    tracing::error!(%hostname, version, "protocol version mismatch on HELLO_RETRY");
                    return None;
                }
                tracing::info!(%hostname, "HELLO_RETRY");
                self.registry.note_restart(hostname, HelloKind::HelloRetry);
                Some(OutboundMsg::HelloOk)
            }
            InboundMsg::Ping => {
                tracing::debug!(%hostname, "PING");
                self.registry.touch(hostname);
                Some(OutboundMsg::Pong)
            }
            InboundMsg::End { job_id, exit_code, error_msg, description_lzma } => {
                tracing::info!(%hostname, %job_id, exit_code, "END");
                self.registry.touch(hostname);
                self.finalise_job(job_id, exit_code, &error_msg, &description_lzma, store).await;
                // spec §4.3.2 point 4: END_OK is sent unconditionally, even
                // for unknown job IDs, so the worker can always forget it.
                Some(OutboundMsg::EndOk { job_id })
            }
            InboundMsg::StartOk { job_id } => {
                tracing::info!(%hostname, %job_id, "START_OK");
                self.registry.touch(hostname);
                if let Err(e) = store.start_job(job_id).await {
                    tracing::warn!(%job_id, error = %e, "START_OK for unknown or unstartable job");
                }
                None
            }
            InboundMsg::Unknown { verb } => {
                tracing::error!(%hostname, verb, "unrecognised control verb");
                None
            }
        }
    }

    /// spec §4.3.1: fresh HELLO cancels all RUNNING pipeline jobs on this
    /// worker, in one transaction per job.
    async fn cancel_running_jobs(&self, hostname: &Hostname, store: &dyn Store) {
        for job in store.jobs_for_worker(hostname, true).await {
            if job.status == JobStatus::Running {
                if let Err(e) = store.cancel_job(job.id).await {
                    tracing::warn!(job_id = %job.id, error = %e, "failed to cancel job on worker restart");
                }
            }
        }
    }

    /// spec §4.3.2 END finalisation.
    async fn finalise_job(&self, job_id: JobId, exit_code: i32, error_msg: &str, description_lzma: &[u8], store: &dyn Store) {
        if let Some(job) = store.get_job(job_id).await {
            if let Err(e) = write_description(&job.output_dir, description_lzma) {
                tracing::error!(%job_id, error = %e, "failed to write description.yaml");
            }
            if let Err(e) = store.parse_job_description(job_id).await {
                tracing::warn!(%job_id, error = %e, "failed to parse job description");
            }
        }

        let Some(job) = store.reload(job_id).await else {
            // Unknown job: still acknowledged by the caller, nothing to finalise.
            return;
        };

        if job.status == JobStatus::Canceling {
            if let Err(e) = store.cancel_job(job_id).await {
                tracing::warn!(%job_id, error = %e, "failed to finalise canceling job");
            }
        }

        let terminal = if exit_code == 0 { JobStatus::Complete } else { JobStatus::Incomplete };
        if let Err(e) = store.fail_job(job_id, error_msg, terminal).await {
            tracing::warn!(%job_id, error = %e, "failed to apply terminal status");
        }
    }

    /// spec §4.3.4: resync a hostname the registry doesn't know about yet by
    /// sending STATUS for every RUNNING pipeline job bound to it.
    pub async fn resync_unknown_worker(&mut self, hostname: &Hostname, store: &dyn Store) -> Vec<OutboundMsg> {
        self.registry.touch_unknown(hostname);
        store
            .jobs_for_worker(hostname, true)
            .await
            .into_iter()
            .filter(|j| j.status == JobStatus::Running)
            .map(|j| OutboundMsg::Status { job_id: j.id })
            .collect()
    }

    pub fn sweep_registry(&mut self, config: &MasterConfig) {
        self.registry.sweep(config);
    }
}

/// spec §4.3.2 point 1: decompress `description_lzma` into
/// `{output_dir}/description.yaml`. Failures are logged but non-fatal.
fn write_description(output_dir: &std::path::Path, description_lzma: &[u8]) -> std::io::Result<()> {
    use std::io::Read;
    std::fs::create_dir_all(output_dir)?;
    let mut decoder = xz2::read::XzDecoder::new(description_lzma);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    std::fs::write(output_dir.join("description.yaml"), text)
}

#[cfg(test)]
#[path = "controlplane_tests.rs"]
mod tests;
