// SPDX-License-Identifier: MIT

//! The dispatcher master daemon: `Registry`, `LogIngest`, `ControlPlane`,
//! and `Dispatcher` (spec §2), wired together by `main.rs`.

pub mod config;
pub mod controlplane;
pub mod dispatcher;
pub mod error;
pub mod logingest;
pub mod registry;
pub mod transport;

pub use config::Cli;
pub use controlplane::ControlPlane;
pub use dispatcher::{DispatchConfig, Dispatcher, Outbox};
pub use error::{DispatchError, TransportError};
pub use logingest::LogIngest;
pub use registry::Registry;
