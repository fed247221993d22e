// SPDX-License-Identifier: MIT

//! The worker registry (spec §4.1): owned exclusively by the main context,
//! no locking of its own (spec §5 "No locking is required for shared state
//! because only this context touches it").

use std::collections::HashMap;

use dispatcher_core::{Clock, Hostname, MasterConfig, Worker};

/// What kind of HELLO caused a `note_restart` call (spec §4.1, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloKind {
    Hello,
    HelloRetry,
}

/// Outcome of `note_restart`, driving the log message and whether the
/// caller should cancel the worker's RUNNING jobs (spec §4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    New,
    Restarted,
    NotConfirmed,
}

pub struct Registry<C: Clock> {
    workers: HashMap<Hostname, Worker>,
    clock: C,
}

impl<C: Clock> Registry<C> {
    pub fn new(clock: C) -> Self {
        Self { workers: HashMap::new(), clock }
    }

    pub fn get(&self, hostname: &Hostname) -> Option<&Worker> {
        self.workers.get(hostname)
    }

    /// spec §4.1 `touch`: update `last_msg_at`; insert if absent and log
    /// "new dispatcher" (the ordinary first-contact path, e.g. PING).
    pub fn touch(&mut self, hostname: &Hostname) {
        let now = self.clock.now();
        match self.workers.get_mut(hostname) {
            Some(w) => {
                w.last_msg_at = Some(now);
                w.online = true;
            }
            None => {
                tracing::warn!(%hostname, "new dispatcher");
                self.workers.insert(hostname.clone(), Worker::new_online(hostname.clone(), now));
            }
        }
    }

    /// spec §4.3.4 resync path: a hostname not in the registry was observed
    /// by some handler other than an explicit HELLO. The original source
    /// uses a distinct log message for this path than for `touch`'s own
    /// insert branch.
    pub fn touch_unknown(&mut self, hostname: &Hostname) {
        if self.workers.contains_key(hostname) {
            self.touch(hostname);
            return;
        }
        tracing::warn!(%hostname, "unknown dispatcher");
        self.workers.insert(hostname.clone(), Worker::new_online(hostname.clone(), self.clock.now()));
    }

    /// spec §4.1 `note_restart`.
    pub fn note_restart(&mut self, hostname: &Hostname, kind: HelloKind) -> RestartOutcome {
        let existed = self.workers.contains_key(hostname);
        self.touch(hostname);
        match (existed, kind) {
            (true, HelloKind::Hello) => {
                tracing::warn!(%hostname, "RESTARTED");
                RestartOutcome::Restarted
            }
            (true, HelloKind::HelloRetry) => {
                tracing::warn!(%hostname, "not confirmed");
                RestartOutcome::NotConfirmed
            }
            (false, _) => {
                tracing::info!(%hostname, "new");
                RestartOutcome::New
            }
        }
    }

    /// spec §4.1 `sweep`: flip stale workers offline. Never removes entries.
    pub fn sweep(&mut self, config: &MasterConfig) {
        let now = self.clock.now();
        for worker in self.workers.values_mut() {
            if worker.online {
                if let Some(last) = worker.last_msg_at {
                    if now.duration_since(last) > config.dispatcher_timeout {
                        worker.online = false;
                        tracing::error!(hostname = %worker.hostname, "OFFLINE");
                    }
                }
            }
        }
    }

    pub fn is_online(&self, hostname: &Hostname) -> bool {
        self.workers.get(hostname).map(|w| w.online).unwrap_or(false)
    }
}

impl<C: Clock> dispatcher_store::WorkerLiveness for Registry<C> {
    fn is_online(&self, hostname: &Hostname) -> bool {
        Registry::is_online(self, hostname)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
