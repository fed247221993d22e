// SPDX-License-Identifier: MIT

//! Immutable tuning constants, constructed once at startup (spec §9: "the
//! dispatch tuning constants should be a single immutable configuration
//! record").

use std::time::Duration;

/// Protocol version negotiated at HELLO (spec §3).
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct MasterConfig {
    /// Poll timeout for the control-socket multiplexed wait (spec §5).
    pub poll_timeout: Duration,
    /// Minimum interval between dispatch sweeps (spec §4.4, `DB_LIMIT`).
    pub db_limit: Duration,
    /// Idle timeout before a `JobLogHandle` is closed (spec §3, `FD_TIMEOUT`).
    pub fd_timeout: Duration,
    /// Idle timeout before a worker is marked offline (spec §4.1,
    /// `DISPATCHER_TIMEOUT`, fixed at 3x the slave ping period).
    pub dispatcher_timeout: Duration,
    /// Idle sleep for the non-blocking log socket poll (spec §4.2).
    pub log_poll_idle: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(10),
            db_limit: Duration::from_secs(10),
            fd_timeout: Duration::from_secs(60),
            dispatcher_timeout: Duration::from_secs(30),
            log_poll_idle: Duration::from_secs(2),
        }
    }
}
