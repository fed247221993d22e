// SPDX-License-Identifier: MIT

//! The log ingestion pipeline (spec §4.2, §6.4, §6.5): owns the
//! `JobLogHandle` table exclusively, never touches the registry or control
//! socket (spec §5, §9 "one owner per table").

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use dispatcher_core::{Clock, JobId, MasterConfig};
use dispatcher_store::Store;
use dispatcher_wire::{LogFrame, LogRecord};

struct JobLogHandle {
    output_dir: PathBuf,
    main_sink: File,
    current_level: String,
    sub_sink: File,
    last_used_at: Instant,
}

fn open_append(path: &std::path::Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn sub_sink_path(output_dir: &std::path::Path, level: &str, name: &str) -> PathBuf {
    let major = level.split('.').next().unwrap_or(level);
    output_dir.join("pipeline").join(major).join(format!("{level}-{name}.yaml"))
}

pub struct LogIngest<C: Clock> {
    handles: HashMap<JobId, JobLogHandle>,
    clock: C,
}

impl<C: Clock> LogIngest<C> {
    pub fn new(clock: C) -> Self {
        Self { handles: HashMap::new(), clock }
    }

    /// spec §4.2 per-frame contract. Returns `Ok(())` once the frame has
    /// been fully handled (including the "drop" outcomes, which are not
    /// errors to the caller — they're already logged here).
    pub async fn process_frame(&mut self, frame: LogFrame, store: &dyn Store) {
        if frame.has_path_traversal() {
            tracing::error!(job_id = %frame.job_id, level = %frame.level, name = %frame.name, "rejected log frame: path traversal in level/name");
            return;
        }

        let Some(record) = LogRecord::parse(&frame.message) else {
            tracing::error!(job_id = %frame.job_id, "dropping malformed log record");
            return;
        };

        if !self.handles.contains_key(&frame.job_id) && store.get_job(frame.job_id).await.is_none() {
            tracing::error!(job_id = %frame.job_id, "dropping log frame for unknown job");
            return;
        }

        if let Err(e) = self.ensure_handle(&frame, store).await {
            tracing::error!(job_id = %frame.job_id, error = %e, "failed to open log handle");
            return;
        }

        if record.is_results() {
            let meta = store
                .create_metadata_store(&frame.message, frame.job_id, &frame.level)
                .await;
            match meta {
                Ok(meta_filename) => {
                    let results = serde_yaml::to_string(&record.msg).unwrap_or_default();
                    if !store.map_scanned_results(&results, frame.job_id, &meta_filename).await {
                        tracing::warn!(job_id = %frame.job_id, "results extractor could not map scanned results");
                    }
                }
                Err(e) => tracing::warn!(job_id = %frame.job_id, error = %e, "results extractor failed"),
            }
        }

        self.write_record(&frame);
    }

    async fn ensure_handle(&mut self, frame: &LogFrame, store: &dyn Store) -> std::io::Result<()> {
        if let Some(handle) = self.handles.get_mut(&frame.job_id) {
            if handle.current_level != frame.level {
                let path = sub_sink_path(&handle.output_dir, &frame.level, &frame.name);
                handle.sub_sink = open_append(&path)?;
                handle.current_level = frame.level.clone();
            }
            return Ok(());
        }

        let output_dir = store
            .get_job(frame.job_id)
            .await
            .map(|j| j.output_dir)
            .unwrap_or_else(|| PathBuf::from(format!("/var/lib/lava-server/default/media/job-output/job-{}", frame.job_id)));
        fs::create_dir_all(&output_dir)?;
        let main_sink = open_append(&output_dir.join("output.yaml"))?;
        let sub_sink = open_append(&sub_sink_path(&output_dir, &frame.level, &frame.name))?;
        self.handles.insert(
            frame.job_id,
            JobLogHandle {
                output_dir,
                main_sink,
                current_level: frame.level.clone(),
                sub_sink,
                last_used_at: self.clock.now(),
            },
        );
        Ok(())
    }

    fn write_record(&mut self, frame: &LogFrame) {
        let Some(handle) = self.handles.get_mut(&frame.job_id) else { return };
        let line = format!("- {}\n", frame.message);
        let _ = handle.main_sink.write_all(line.as_bytes());
        let _ = handle.main_sink.flush();
        let _ = handle.sub_sink.write_all(line.as_bytes());
        let _ = handle.sub_sink.flush();
        handle.last_used_at = self.clock.now();
    }

    /// Close and drop any handle idle longer than `fd_timeout` (spec §3
    /// JobLogHandle lifecycle, `FD_TIMEOUT`).
    pub fn reap_idle(&mut self, config: &MasterConfig) {
        let now = self.clock.now();
        self.handles.retain(|job_id, handle| {
            let idle = now.duration_since(handle.last_used_at) > config.fd_timeout;
            if idle {
                tracing::debug!(%job_id, "closing idle job log handle");
            }
            !idle
        });
    }

    pub fn open_job_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
#[path = "logingest_tests.rs"]
mod tests;
