// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use super::{Endpoint, Topology};
use crate::core::element::{Element, ElementId, IoSignature, Port};
use crate::core::flow::Flow;

struct HierInner {
    id: ElementId,
    name: String,
    signature: IoSignature,
    topology: RwLock<Topology>,
}

/// A container element wrapping its own sub-graph.
///
/// Inside the container, a flow from the container's own port `i` forwards
/// external input `i` inward, and a flow into the container's own port `j`
/// exposes an inner output as external output `j`. Cloning is cheap.
#[derive(Clone)]
pub struct HierBlock {
    inner: Arc<HierInner>,
}

impl HierBlock {
    pub fn new(name: impl Into<String>, signature: IoSignature) -> Self {
        Self::with_id(ElementId::new_hier(), name, signature)
    }

    pub fn with_id(id: impl Into<ElementId>, name: impl Into<String>, signature: IoSignature) -> Self {
        let id = id.into();
        Self {
            inner: Arc::new(HierInner {
                topology: RwLock::new(Topology::new(id.clone(), signature)),
                id,
                name: name.into(),
                signature,
            }),
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn signature(&self) -> IoSignature {
        self.inner.signature
    }

    /// True when both handles refer to the same container.
    pub fn same_as(&self, other: &HierBlock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// This container as an element, for wiring its external ports.
    pub fn element(&self) -> Element {
        Element::Hier(self.clone())
    }

    pub fn port(&self, index: usize) -> Port {
        Port::new(self.element(), index)
    }

    /// Declare a flow inside this container. Returns false for a duplicate.
    pub fn connect(&self, src: &Element, src_index: usize, dst: &Element, dst_index: usize) -> bool {
        self.connect_flow(Flow::between(src, src_index, dst, dst_index))
    }

    pub fn connect_flow(&self, flow: Flow) -> bool {
        self.inner.topology.write().connect(flow)
    }

    pub fn disconnect(&self, src: &Element, src_index: usize, dst: &Element, dst_index: usize) -> bool {
        self.inner
            .topology
            .write()
            .disconnect(&Flow::between(src, src_index, dst, dst_index))
    }

    pub fn disconnect_all(&self) {
        self.inner.topology.write().disconnect_all();
    }

    /// Declared flows, with forwarding endpoints expressed on this container.
    pub fn flows(&self) -> Vec<Flow> {
        let me = self.element();
        let endpoint = |e: &Endpoint| match e {
            Endpoint::External(index) => me.port(*index),
            Endpoint::Port(port) => port.clone(),
        };
        self.inner
            .topology
            .read()
            .declared()
            .iter()
            .map(|d| Flow::new(endpoint(&d.src), endpoint(&d.dst)))
            .collect()
    }

    /// Leaf elements declared inside, recursively, in declaration order.
    pub fn leaves(&self) -> Vec<Element> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_leaves(&mut seen, &mut out);
        out
    }

    fn collect_leaves(&self, seen: &mut HashSet<ElementId>, out: &mut Vec<Element>) {
        if !seen.insert(self.id().clone()) {
            return;
        }
        for element in self.topology().elements() {
            match &element {
                Element::Block(_) => {
                    if seen.insert(element.id().clone()) {
                        out.push(element.clone());
                    }
                }
                Element::Hier(hier) => hier.collect_leaves(seen, out),
            }
        }
    }

    pub(crate) fn topology(&self) -> RwLockReadGuard<'_, Topology> {
        self.inner.topology.read_recursive()
    }
}

impl fmt::Debug for HierBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierBlock")
            .field("id", self.id())
            .field("name", &self.name())
            .field("signature", &self.signature())
            .finish()
    }
}
