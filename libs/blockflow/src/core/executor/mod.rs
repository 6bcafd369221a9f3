// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Incremental commit of the resolved graph onto live workers.

mod commit_phase;
mod commit_result;
mod delta;
#[allow(clippy::module_inception)]
mod executor;

pub use commit_phase::CommitPhase;
pub use commit_result::CommitResult;
pub use delta::FlowDelta;
pub use executor::Executor;
