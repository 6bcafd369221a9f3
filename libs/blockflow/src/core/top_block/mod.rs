// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Client-facing lifecycle controller and runtime queries.

mod query;
#[allow(clippy::module_inception)]
mod top_block;

pub use query::{QueryPath, QueryRequest};
pub use top_block::TopBlock;
