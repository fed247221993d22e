// SPDX-License-Identifier: MIT

//! The `Worker` record (spec §3). Pure data — the mutation rules
//! (`touch`, `note_restart`, `sweep`) live in the daemon's `Registry`.

use crate::ids::Hostname;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Worker {
    pub hostname: Hostname,
    pub online: bool,
    pub last_msg_at: Option<Instant>,
}

impl Worker {
    pub fn new_online(hostname: Hostname, now: Instant) -> Self {
        Self { hostname, online: true, last_msg_at: Some(now) }
    }
}
