// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Declared graph and its flattening into leaf-to-leaf flows.

mod hier_block;
#[allow(clippy::module_inception)]
mod topology;

pub use hier_block::HierBlock;
pub use topology::{DeclaredFlow, Endpoint, Topology};
