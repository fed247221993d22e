// SPDX-License-Identifier: MIT

//! The log-socket message shape (spec §4.2, §6.4): four frames
//! `(job_id, level, name, message)` where `message` decodes to a mapping
//! with at least `lvl` and `msg`.

use crate::error::WireError;
use dispatcher_core::JobId;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFrame {
    pub job_id: JobId,
    pub level: String,
    pub name: String,
    /// The raw textual record, unparsed — written verbatim (wrapped as
    /// `- {message}`) to the log sinks.
    pub message: String,
}

impl LogFrame {
    pub fn decode(frames: &[Vec<u8>]) -> Result<Self, WireError> {
        if frames.len() != 4 {
            return Err(WireError::WrongArity {
                verb: "<log-frame>".to_string(),
                expected: 4,
                got: frames.len(),
            });
        }
        let job_id_str =
            String::from_utf8(frames[0].clone()).map_err(|_| WireError::NotUtf8 { field: "job_id" })?;
        let job_id: u64 =
            job_id_str.trim().parse().map_err(|_| WireError::NotAnInteger { field: "job_id" })?;
        let level = String::from_utf8(frames[1].clone()).map_err(|_| WireError::NotUtf8 { field: "level" })?;
        let name = String::from_utf8(frames[2].clone()).map_err(|_| WireError::NotUtf8 { field: "name" })?;
        let message =
            String::from_utf8(frames[3].clone()).map_err(|_| WireError::NotUtf8 { field: "message" })?;
        Ok(LogFrame { job_id: JobId::new(job_id), level, name, message })
    }

    /// A `level`/`name` containing a path separator would let a hostile
    /// worker escape `pipeline/{major}/` onto the filesystem (spec §4.2
    /// point 2, invariant §8.6).
    pub fn has_path_traversal(&self) -> bool {
        self.level.contains('/') || self.name.contains('/')
    }

    /// The major sub-directory under `pipeline/` (spec §3: `current_level`
    /// split on `.`, first component).
    pub fn major_level(&self) -> &str {
        self.level.split('.').next().unwrap_or(&self.level)
    }
}

/// The minimal decoded shape of a log record's `message` field.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub lvl: String,
    pub msg: serde_yaml::Value,
}

impl LogRecord {
    /// Parse `message` as a YAML mapping with at least `lvl` and `msg`.
    /// Spec §4.2 point 1: malformed records (wrong shape, missing keys) are
    /// dropped rather than propagated as a hard error.
    pub fn parse(message: &str) -> Option<Self> {
        serde_yaml::from_str(message).ok()
    }

    pub fn is_results(&self) -> bool {
        self.lvl == "results"
    }
}

#[cfg(test)]
#[path = "logframe_tests.rs"]
mod tests;
