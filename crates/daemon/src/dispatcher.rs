// SPDX-License-Identifier: MIT

//! The periodic dispatch sweep (spec §4.4). Runs on the main context,
//! sharing the Registry and control-socket writer with the ControlPlane
//! (spec §5 — never concurrently).

use std::path::Path;

use dispatcher_core::{Hostname, Job, JobId, JobStatus};
use dispatcher_store::{Store, WorkerLiveness};
use dispatcher_wire::OutboundMsg;

use crate::error::DispatchError;

/// One piece of output from a sweep: a message to send to a worker. The
/// caller (the daemon's main loop) owns the actual socket write so this
/// module stays transport-agnostic and unit-testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbox {
    pub to: Hostname,
    pub msg: OutboundMsg,
}

fn read_optional_yaml(path: Option<&Path>) -> Result<String, DispatchError> {
    let Some(path) = path else { return Ok(String::new()) };
    match std::fs::read_to_string(path) {
        Ok(text) => {
            // Validate it parses even though the result is re-serialised
            // verbatim: an invalid-but-present file is a fatal per-job error.
            let _: serde_yaml::Value = serde_yaml::from_str(&text)
                .map_err(|source| DispatchError::InvalidYaml { path: path.display().to_string(), source })?;
            Ok(text)
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(DispatchError::UnreadableFile { path: path.display().to_string(), source }),
    }
}

/// spec §4.4 step 5: the device configuration template is rendered against
/// the job definition's `context` key (`dispatcher-master.py:515-532`,
/// `job_def.get('context', {})`), not `target_group` (an unrelated sort key).
fn job_context(job: &Job) -> Result<String, DispatchError> {
    if job.definition.trim().is_empty() {
        return Ok(String::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(&job.definition)
        .map_err(|source| DispatchError::InvalidYaml { path: "definition".to_string(), source })?;
    let context = value
        .as_mapping()
        .and_then(|map| map.get(serde_yaml::Value::String("context".to_string())))
        .cloned()
        .unwrap_or_else(|| serde_yaml::Value::Mapping(Default::default()));
    serde_yaml::to_string(&context).map_err(|source| DispatchError::InvalidYaml { path: "definition".to_string(), source })
}

/// spec §4.4 "Definition export": round-trip the job's textual definition
/// through a structured parse, inject `compatibility`, re-serialise.
pub fn export_definition(job: &Job) -> Result<String, DispatchError> {
    let mut value: serde_yaml::Value = if job.definition.trim().is_empty() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        serde_yaml::from_str(&job.definition)
            .map_err(|source| DispatchError::InvalidYaml { path: "definition".to_string(), source })?
    };
    if let serde_yaml::Value::Mapping(map) = &mut value {
        map.insert(
            serde_yaml::Value::String("compatibility".to_string()),
            serde_yaml::Value::String(job.pipeline_compatibility.clone()),
        );
    }
    serde_yaml::to_string(&value).map_err(|source| DispatchError::InvalidYaml { path: "definition".to_string(), source })
}

pub struct DispatchConfig {
    pub env_path: Option<std::path::PathBuf>,
    pub env_dut_path: Option<std::path::PathBuf>,
    pub dispatchers_config_dir: Option<std::path::PathBuf>,
}

pub struct Dispatcher;

impl Dispatcher {
    /// spec §4.4 Phase 1: assign submitted jobs. Each job failure is caught
    /// and marked INCOMPLETE; the rest of the sweep proceeds.
    pub async fn assign_submitted(
        store: &dyn Store,
        liveness: &dyn WorkerLiveness,
        config: &DispatchConfig,
    ) -> Vec<Outbox> {
        let mut outbox = Vec::new();
        for candidate in store.jobs_submitted_pipeline_with_device().await {
            if let Err(e) = Self::assign_one(store, liveness, config, candidate.id, &mut outbox).await {
                tracing::error!(job_id = %candidate.id, error = %e, "Infrastructure error");
                let _ = store.fail_job(candidate.id, &format!("Infrastructure error: {e}"), JobStatus::Incomplete).await;
            }
        }
        outbox
    }

    async fn assign_one(
        store: &dyn Store,
        liveness: &dyn WorkerLiveness,
        config: &DispatchConfig,
        job_id: JobId,
        outbox: &mut Vec<Outbox>,
    ) -> Result<(), DispatchError> {
        let Some(device) = store.select_device(job_id, liveness).await else {
            return Ok(());
        };

        let job = store.reload(job_id).await.ok_or(DispatchError::NoDevice(job_id.0))?;
        let device = job.actual_device.clone().unwrap_or(device);
        let worker_host = device.worker_host.clone().ok_or(DispatchError::NoWorkerHost(job_id.0))?;

        if job.actual_device.is_none() {
            store.create_job(job_id, device.clone()).await?;
        } else {
            tracing::info!(%job_id, "retrying job already assigned to a device");
        }

        let env = read_optional_yaml(config.env_path.as_deref())?;
        let env_dut = read_optional_yaml(config.env_dut_path.as_deref())?;
        let dispatcher_config = read_optional_yaml(
            config
                .dispatchers_config_dir
                .as_ref()
                .map(|dir| dir.join(format!("{}.yaml", worker_host)))
                .as_deref(),
        )?;

        let context = job_context(&job)?;

        if job.is_multinode {
            for sub_id in &job.sub_jobs {
                if let Some(sub) = store.get_job(*sub_id).await {
                    if sub.dynamic_connection {
                        if let Some(sub_host) = sub.worker_host().cloned() {
                            let device_config = device.load_device_configuration(&context);
                            outbox.push(Outbox {
                                to: sub_host,
                                msg: OutboundMsg::Start {
                                    job_id: sub.id,
                                    definition: export_definition(&sub)?,
                                    device_config,
                                    dispatcher_config: dispatcher_config.clone(),
                                    env: env.clone(),
                                    env_dut: env_dut.clone(),
                                },
                            });
                        }
                    }
                }
            }
        }

        let device_config = device.load_device_configuration(&context);
        outbox.push(Outbox {
            to: worker_host,
            msg: OutboundMsg::Start {
                job_id,
                definition: export_definition(&job)?,
                device_config,
                dispatcher_config,
                env,
                env_dut,
            },
        });

        Ok(())
    }

    /// spec §4.4 Phase 2: propagate cancellations.
    pub async fn propagate_cancellations(store: &dyn Store) -> Vec<Outbox> {
        let mut outbox = Vec::new();
        for job in store.jobs_canceling_pipeline().await {
            match resolve_worker(&job) {
                Some(host) => outbox.push(Outbox { to: host, msg: OutboundMsg::Cancel { job_id: job.id } }),
                None => {
                    if let Err(e) = store.cancel_job(job.id).await {
                        tracing::warn!(job_id = %job.id, error = %e, "failed to finalise unresolvable cancel");
                    }
                }
            }
        }
        outbox
    }
}

fn resolve_worker(job: &Job) -> Option<Hostname> {
    if job.dynamic_connection {
        job.lookup_worker.clone()
    } else {
        job.actual_device.as_ref().and_then(|d| d.worker_host.clone())
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
