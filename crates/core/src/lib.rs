// SPDX-License-Identifier: MIT

//! Shared domain types for the dispatcher master.
//!
//! This crate has no I/O of its own: it defines the vocabulary the wire,
//! storage, and daemon crates build on (hostnames, job ids, job/device
//! records, the tuning-constants record, and a testable clock).

mod clock;
mod config;
mod ids;
mod job;
mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{MasterConfig, PROTOCOL_VERSION};
pub use ids::{Hostname, JobId};
pub use job::{Device, Job, JobStatus};
pub use worker::Worker;
