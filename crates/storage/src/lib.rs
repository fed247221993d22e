// SPDX-License-Identifier: MIT

//! The persistent job/device store, standing in for the external
//! collaborator named in spec §6.2. The schema itself is explicitly out of
//! scope; this crate only fixes the trait boundary the dispatcher core
//! depends on, plus an in-memory reference implementation.

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use store::{Store, WorkerLiveness};
