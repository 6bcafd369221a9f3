// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::core::block::{Block, BlockContext, PropertySpec, PropertyType, PropertyValue, WorkIo};
use crate::core::element::IoSignature;
use crate::core::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullSourceConfig {
    pub item_size: usize,
}

impl Default for NullSourceConfig {
    fn default() -> Self {
        Self { item_size: 1 }
    }
}

/// Endless stream of zeroed items, one full output buffer per work call.
pub struct NullSource {
    config: NullSourceConfig,
    buffer: Bytes,
}

impl NullSource {
    pub fn new(config: NullSourceConfig) -> Self {
        Self {
            config,
            buffer: Bytes::new(),
        }
    }
}

impl Block for NullSource {
    fn signature(&self) -> IoSignature {
        IoSignature::source(1).with_item_size(self.config.item_size)
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::read_only("item_size", PropertyType::UInt)]
    }

    fn get_property(&self, key: &str) -> Option<PropertyValue> {
        match key {
            "item_size" => Some(PropertyValue::UInt(self.config.item_size as u64)),
            _ => None,
        }
    }

    fn activate(&mut self, ctx: &BlockContext) -> Result<()> {
        let item_size = self.config.item_size.max(1);
        let size = ctx.output_buffer_sizes.first().copied().unwrap_or(item_size);
        let whole = (size / item_size).max(1) * item_size;
        self.buffer = BytesMut::zeroed(whole).freeze();
        Ok(())
    }

    fn work(&mut self, io: &mut WorkIo<'_>) -> Result<()> {
        io.produce(0, self.buffer.clone());
        Ok(())
    }
}
