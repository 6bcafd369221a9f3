// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::sync::Arc;

use super::{ElementId, IoSignature, Port};
use crate::core::block::Block;
use crate::core::topology::HierBlock;
use crate::core::worker::{Worker, WorkerMessage};

/// A node of the declared graph.
///
/// Leaf elements map 1:1 onto a [`Worker`]; hierarchical elements own a
/// sub-topology that is flattened away during resolve. Cloning is cheap and
/// clones refer to the same node.
#[derive(Clone)]
pub enum Element {
    Block(Arc<Worker>),
    Hier(HierBlock),
}

impl Element {
    /// Wrap a block implementation into a leaf element with a generated id.
    pub fn block<B: Block>(name: impl Into<String>, block: B) -> Self {
        Self::block_with_id(ElementId::new_block(), name, block)
    }

    /// Wrap a block implementation into a leaf element with a caller-chosen id.
    pub fn block_with_id<B: Block>(
        id: impl Into<ElementId>,
        name: impl Into<String>,
        block: B,
    ) -> Self {
        Self::from_boxed(id, name, Box::new(block))
    }

    /// Wrap an already boxed block, as produced by a registry constructor.
    pub fn from_boxed(
        id: impl Into<ElementId>,
        name: impl Into<String>,
        block: Box<dyn Block>,
    ) -> Self {
        Self::Block(Worker::new(id.into(), name.into(), block))
    }

    pub fn id(&self) -> &ElementId {
        match self {
            Self::Block(worker) => worker.id(),
            Self::Hier(hier) => hier.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Block(worker) => worker.name(),
            Self::Hier(hier) => hier.name(),
        }
    }

    pub fn signature(&self) -> IoSignature {
        match self {
            Self::Block(worker) => worker.signature(),
            Self::Hier(hier) => hier.signature(),
        }
    }

    /// True when both handles refer to the same node, not merely the same id.
    pub fn same_as(&self, other: &Element) -> bool {
        match (self, other) {
            (Self::Block(a), Self::Block(b)) => Arc::ptr_eq(a, b),
            (Self::Hier(a), Self::Hier(b)) => a.same_as(b),
            _ => false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    pub fn worker(&self) -> Option<&Arc<Worker>> {
        match self {
            Self::Block(worker) => Some(worker),
            Self::Hier(_) => None,
        }
    }

    pub fn hier(&self) -> Option<&HierBlock> {
        match self {
            Self::Block(_) => None,
            Self::Hier(hier) => Some(hier),
        }
    }

    /// Endpoint coordinate on this element.
    pub fn port(&self, index: usize) -> Port {
        Port::new(self.clone(), index)
    }

    /// Drive this block to the inert state, releasing its completion token.
    ///
    /// Hier blocks forward the request to every leaf declared inside them.
    pub fn mark_done(&self) {
        match self {
            Self::Block(worker) => worker.post(WorkerMessage::Inert),
            Self::Hier(hier) => {
                for leaf in hier.leaves() {
                    leaf.mark_done();
                }
            }
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Block(_) => "Block",
            Self::Hier(_) => "Hier",
        };
        f.debug_struct(kind)
            .field("id", self.id())
            .field("name", &self.name())
            .finish()
    }
}

impl From<HierBlock> for Element {
    fn from(hier: HierBlock) -> Self {
        Self::Hier(hier)
    }
}

impl From<&HierBlock> for Element {
    fn from(hier: &HierBlock) -> Self {
        Self::Hier(hier.clone())
    }
}
