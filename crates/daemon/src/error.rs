// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Infrastructure failures that abort a single job's dispatch (spec §7
/// "Per-job infrastructure error") without affecting the rest of the sweep.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing device for job {0}")]
    NoDevice(u64),

    #[error("chosen device for job {0} has no worker host")]
    NoWorkerHost(u64),

    #[error("could not read {path}: {source}")]
    UnreadableFile { path: String, #[source] source: std::io::Error },

    #[error("invalid YAML in {path}: {source}")]
    InvalidYaml { path: String, #[source] source: serde_yaml::Error },

    #[error(transparent)]
    Store(#[from] dispatcher_store::StoreError),
}

/// Bootstrap failures fatal to the process (spec §7 "Misconfigured host",
/// "Auth/encryption bootstrap failure is fatal").
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("role sentinel {0} exists: this host is configured as a worker, not a master")]
    RoleSentinel(String),

    #[error("failed to bind control socket {addr}: {source}")]
    ControlBind { addr: String, #[source] source: zeromq::ZmqError },

    #[error("failed to bind log socket {addr}: {source}")]
    LogBind { addr: String, #[source] source: zeromq::ZmqError },

    #[error("failed to load CURVE credentials: {0}")]
    Curve(String),
}
