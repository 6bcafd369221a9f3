// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::{PropertySpec, PropertyValue, WorkIo};
use crate::core::element::IoSignature;
use crate::core::error::{FlowError, Result};
use crate::core::thread_group::ThreadGroup;

/// Resources handed to a block when it activates.
#[derive(Clone, Default)]
pub struct BlockContext {
    /// Controller-owned helper threads. Interrupted by `TopBlock::stop()`.
    pub thread_group: Option<ThreadGroup>,
    /// Allocated size in bytes of each output port's buffers.
    pub output_buffer_sizes: Vec<usize>,
}

/// A processing element driven by a worker actor.
///
/// All methods run on the worker's actor, one message at a time, so
/// implementations never see concurrent calls.
pub trait Block: Send + 'static {
    /// Port counts and item size.
    fn signature(&self) -> IoSignature;

    /// Process queued input and produce output.
    ///
    /// Called while the worker is active, whenever new input arrives and,
    /// for blocks without connected inputs, again after every call that made
    /// progress. Call [`WorkIo::mark_done`] to finish.
    fn work(&mut self, io: &mut WorkIo<'_>) -> Result<()>;

    /// Properties exposed for introspection. Read once at construction.
    fn properties(&self) -> Vec<PropertySpec> {
        Vec::new()
    }

    fn get_property(&self, _key: &str) -> Option<PropertyValue> {
        None
    }

    fn set_property(&mut self, key: &str, _value: PropertyValue) -> Result<()> {
        Err(FlowError::NotSupported(format!(
            "property '{}' cannot be set",
            key
        )))
    }

    fn activate(&mut self, _ctx: &BlockContext) -> Result<()> {
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after the worker adopted a new connection table.
    fn notify_topology(&mut self, _connected_inputs: usize, _connected_outputs: usize) -> Result<()> {
        Ok(())
    }
}
