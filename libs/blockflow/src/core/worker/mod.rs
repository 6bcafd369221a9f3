// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Runtime side of a leaf block.
//!
//! A [`Worker`] is the proxy the executor wires and the controller
//! broadcasts to. Its actor owns the block and handles one message at a
//! time on the worker's thread pool.

mod actor;
mod mailbox;
mod message;
mod port_ref;
mod stats;
#[allow(clippy::module_inception)]
mod worker;

pub use message::{PropAccess, WorkerMessage, WorkerResources};
pub use port_ref::{ConnectionTables, PortRef};
pub use stats::BlockStats;
pub use worker::{Worker, WorkerState};
