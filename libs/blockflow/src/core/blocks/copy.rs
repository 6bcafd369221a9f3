// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::block::{Block, PropertySpec, PropertyType, PropertyValue, WorkIo};
use crate::core::element::IoSignature;
use crate::core::error::{FlowError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    pub item_size: usize,
    pub enabled: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            item_size: 1,
            enabled: true,
        }
    }
}

/// Passes input buffers through. Drops them while disabled.
pub struct CopyBlock {
    config: CopyConfig,
}

impl CopyBlock {
    pub fn new(config: CopyConfig) -> Self {
        Self { config }
    }
}

impl Block for CopyBlock {
    fn signature(&self) -> IoSignature {
        IoSignature::new(1, 1).with_item_size(self.config.item_size)
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::read_write("enabled", PropertyType::Bool)]
    }

    fn get_property(&self, key: &str) -> Option<PropertyValue> {
        (key == "enabled").then_some(PropertyValue::Bool(self.config.enabled))
    }

    fn set_property(&mut self, key: &str, value: PropertyValue) -> Result<()> {
        match (key, value.as_bool()) {
            ("enabled", Some(enabled)) => {
                self.config.enabled = enabled;
                Ok(())
            }
            _ => Err(FlowError::NotSupported(format!(
                "property '{}' cannot be set to {:?}",
                key, value
            ))),
        }
    }

    fn work(&mut self, io: &mut WorkIo<'_>) -> Result<()> {
        while let Some(buffer) = io.pop_input(0) {
            if self.config.enabled {
                io.produce(0, buffer);
            }
        }
        Ok(())
    }
}
