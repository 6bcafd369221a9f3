// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The block capability interface.
//!
//! Every worker talks to its block only through [`Block`]: work, lifecycle
//! hooks and typed property access. No downcasts to concrete block types.

#[allow(clippy::module_inception)]
mod block;
mod property;
mod work_io;

pub use block::{Block, BlockContext};
pub use property::{PropertyRegistry, PropertySpec, PropertyType, PropertyValue};
pub use work_io::WorkIo;
