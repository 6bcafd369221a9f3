// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Port counts and item size of an element.
///
/// Port indices are coordinates: a flow endpoint `(element, index)` is valid
/// when `index` is below the matching count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSignature {
    pub inputs: usize,
    pub outputs: usize,
    /// Bytes per stream item, used to turn buffer lengths into item counts.
    pub item_size: usize,
}

impl IoSignature {
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            item_size: 1,
        }
    }

    pub fn source(outputs: usize) -> Self {
        Self::new(0, outputs)
    }

    pub fn sink(inputs: usize) -> Self {
        Self::new(inputs, 0)
    }

    pub fn with_item_size(mut self, item_size: usize) -> Self {
        self.item_size = item_size.max(1);
        self
    }

    /// Number of whole items in `bytes` bytes.
    pub fn items(&self, bytes: usize) -> u64 {
        (bytes / self.item_size) as u64
    }
}

impl Default for IoSignature {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_counting() {
        let sig = IoSignature::new(1, 1).with_item_size(4);
        assert_eq!(sig.items(16), 4);
        assert_eq!(sig.items(15), 3);
        assert_eq!(IoSignature::sink(2).with_item_size(0).item_size, 1);
    }
}
