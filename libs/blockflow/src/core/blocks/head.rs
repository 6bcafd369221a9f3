// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::block::{Block, BlockContext, PropertySpec, PropertyType, PropertyValue, WorkIo};
use crate::core::element::IoSignature;
use crate::core::error::{FlowError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadConfig {
    pub num_items: u64,
    pub item_size: usize,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            num_items: 1024,
            item_size: 1,
        }
    }
}

/// Forwards the first `num_items` items, then finishes.
pub struct HeadBlock {
    config: HeadConfig,
    remaining: u64,
}

impl HeadBlock {
    pub fn new(config: HeadConfig) -> Self {
        Self {
            remaining: config.num_items,
            config,
        }
    }
}

impl Block for HeadBlock {
    fn signature(&self) -> IoSignature {
        IoSignature::new(1, 1).with_item_size(self.config.item_size)
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![
            PropertySpec::read_write("num_items", PropertyType::UInt),
            PropertySpec::read_only("remaining", PropertyType::UInt),
        ]
    }

    fn get_property(&self, key: &str) -> Option<PropertyValue> {
        match key {
            "num_items" => Some(PropertyValue::UInt(self.config.num_items)),
            "remaining" => Some(PropertyValue::UInt(self.remaining)),
            _ => None,
        }
    }

    fn set_property(&mut self, key: &str, value: PropertyValue) -> Result<()> {
        match (key, value.as_u64()) {
            ("num_items", Some(num_items)) => {
                self.config.num_items = num_items;
                Ok(())
            }
            _ => Err(FlowError::NotSupported(format!(
                "property '{}' cannot be set to {:?}",
                key, value
            ))),
        }
    }

    fn activate(&mut self, _ctx: &BlockContext) -> Result<()> {
        self.remaining = self.config.num_items;
        Ok(())
    }

    fn work(&mut self, io: &mut WorkIo<'_>) -> Result<()> {
        let item_size = self.config.item_size.max(1);
        while self.remaining > 0 {
            let Some(buffer) = io.pop_input(0) else {
                break;
            };
            let items = (buffer.len() / item_size) as u64;
            if items <= self.remaining {
                self.remaining -= items;
                io.produce(0, buffer);
            } else {
                let take = self.remaining as usize * item_size;
                io.produce(0, buffer.slice(..take));
                io.push_back_input(0, buffer.slice(take..));
                self.remaining = 0;
            }
        }

        if self.remaining == 0 {
            io.mark_done();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;

    #[test]
    fn test_head_splits_last_buffer() {
        let mut head = HeadBlock::new(HeadConfig {
            num_items: 6,
            item_size: 2,
        });
        let mut inputs = vec![VecDeque::from(vec![
            Bytes::from_static(&[0; 8]),
            Bytes::from_static(&[0; 8]),
        ])];
        let done = [false];
        let sizes = [16];
        let mut io = WorkIo::new(&mut inputs, &done, &sizes);

        head.work(&mut io).unwrap();
        assert!(io.is_done());
        let produced = io.take_produced();
        let lens: Vec<_> = produced[0].iter().map(Bytes::len).collect();
        assert_eq!(lens, [8, 4]);
        assert_eq!(head.get_property("remaining"), Some(PropertyValue::UInt(0)));
        drop(io);
        assert_eq!(inputs[0].front().map(Bytes::len), Some(4));
    }

    #[test]
    fn test_num_items_is_settable() {
        let mut head = HeadBlock::new(HeadConfig::default());
        head.set_property("num_items", PropertyValue::UInt(10)).unwrap();
        assert!(head.set_property("remaining", PropertyValue::UInt(1)).is_err());

        head.activate(&BlockContext::default()).unwrap();
        assert_eq!(head.get_property("remaining"), Some(PropertyValue::UInt(10)));
    }
}
