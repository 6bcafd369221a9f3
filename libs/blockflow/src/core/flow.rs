// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use crate::core::element::{Element, Port};

/// Directed edge between two `(element, index)` endpoints.
///
/// Flows are immutable; rewiring removes one flow and inserts another.
/// Equality is structural over both endpoints.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Flow {
    pub src: Port,
    pub dst: Port,
}

impl Flow {
    pub fn new(src: Port, dst: Port) -> Self {
        Self { src, dst }
    }

    pub fn between(src: &Element, src_index: usize, dst: &Element, dst_index: usize) -> Self {
        Self::new(src.port(src_index), dst.port(dst_index))
    }

    /// True when both endpoints are leaf blocks.
    pub fn is_flat(&self) -> bool {
        self.src.element.is_leaf() && self.dst.element.is_leaf()
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.src, self.dst)
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}
