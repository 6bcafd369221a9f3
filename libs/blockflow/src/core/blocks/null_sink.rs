// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::block::{Block, PropertySpec, PropertyType, PropertyValue, WorkIo};
use crate::core::element::IoSignature;
use crate::core::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullSinkConfig {
    pub item_size: usize,
}

impl Default for NullSinkConfig {
    fn default() -> Self {
        Self { item_size: 1 }
    }
}

/// Discards everything it receives and counts the items.
pub struct NullSink {
    config: NullSinkConfig,
    items: Arc<AtomicU64>,
}

impl NullSink {
    pub fn new(config: NullSinkConfig) -> Self {
        Self {
            config,
            items: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle to the consumed item count.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.items)
    }
}

impl Block for NullSink {
    fn signature(&self) -> IoSignature {
        IoSignature::sink(1).with_item_size(self.config.item_size)
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::read_only("items", PropertyType::UInt)]
    }

    fn get_property(&self, key: &str) -> Option<PropertyValue> {
        match key {
            "items" => Some(PropertyValue::UInt(self.items.load(Ordering::Relaxed))),
            _ => None,
        }
    }

    fn work(&mut self, io: &mut WorkIo<'_>) -> Result<()> {
        let item_size = self.config.item_size.max(1);
        while let Some(buffer) = io.pop_input(0) {
            self.items
                .fetch_add((buffer.len() / item_size) as u64, Ordering::Relaxed);
        }
        Ok(())
    }
}
