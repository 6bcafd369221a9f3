// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::{HashMap, HashSet};

use crate::core::element::{Element, ElementId, IoSignature, Port};
use crate::core::error::{FlowError, Result};
use crate::core::flow::Flow;

/// Nesting depth at which resolve gives up on a container chain.
const MAX_NESTING: usize = 64;

/// One end of a declared flow.
///
/// Endpoints on the owning container are kept as bare port indices so a
/// container never holds a strong handle to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Port `i` of the topology's owner.
    External(usize),
    Port(Port),
}

impl Endpoint {
    fn port(&self) -> Option<&Port> {
        match self {
            Self::External(_) => None,
            Self::Port(port) => Some(port),
        }
    }
}

/// A flow as declared, before flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredFlow {
    pub src: Endpoint,
    pub dst: Endpoint,
}

/// The declared, possibly hierarchical graph of one owner.
///
/// Flows are kept in declaration order; [`resolve`](Topology::resolve)
/// depends only on that list and the nested containers' lists.
#[derive(Debug, Clone)]
pub struct Topology {
    owner: ElementId,
    owner_signature: IoSignature,
    flows: Vec<DeclaredFlow>,
}

impl Topology {
    pub fn new(owner: ElementId, owner_signature: IoSignature) -> Self {
        Self {
            owner,
            owner_signature,
            flows: Vec::new(),
        }
    }

    pub fn owner(&self) -> &ElementId {
        &self.owner
    }

    fn endpoint(&self, port: Port) -> Endpoint {
        if port.id() == &self.owner {
            Endpoint::External(port.index)
        } else {
            Endpoint::Port(port)
        }
    }

    fn declare(&self, flow: &Flow) -> DeclaredFlow {
        DeclaredFlow {
            src: self.endpoint(flow.src.clone()),
            dst: self.endpoint(flow.dst.clone()),
        }
    }

    /// Add a flow. Returns false if an identical flow is already declared.
    pub fn connect(&mut self, flow: Flow) -> bool {
        let declared = self.declare(&flow);
        if self.flows.contains(&declared) {
            return false;
        }
        tracing::trace!("[{}] connect {}", self.owner, flow);
        self.flows.push(declared);
        true
    }

    /// Remove a flow. Returns false if it was not declared.
    pub fn disconnect(&mut self, flow: &Flow) -> bool {
        let declared = self.declare(flow);
        match self.flows.iter().position(|f| f == &declared) {
            Some(pos) => {
                tracing::trace!("[{}] disconnect {}", self.owner, flow);
                self.flows.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn disconnect_all(&mut self) {
        self.flows.clear();
    }

    pub fn declared(&self) -> &[DeclaredFlow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Elements referenced by declared flows, first appearance first.
    pub fn elements(&self) -> Vec<Element> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for flow in &self.flows {
            for port in [flow.src.port(), flow.dst.port()].into_iter().flatten() {
                if seen.insert(port.id().clone()) {
                    out.push(port.element.clone());
                }
            }
        }
        out
    }

    /// Flatten the declared graph into flows between leaf blocks.
    ///
    /// Container endpoints are replaced by the leaf ports their sub-graph
    /// forwards to, recursively. The result is deduplicated, keeps
    /// declaration order and is identical across calls with no edits in
    /// between. Fails with [`FlowError::Topology`] on an out-of-range port,
    /// a container port with nothing behind it, a reference to this
    /// topology's own ports that cannot be forwarded, or a leaf input driven
    /// by more than one source.
    pub fn resolve(&self) -> Result<Vec<Flow>> {
        let mut flat = Vec::new();
        self.flatten_into(&mut flat, 0)?;
        check_unique_ids(&flat)?;

        let mut seen = HashSet::new();
        flat.retain(|flow| seen.insert(flow.clone()));

        check_single_driver(&flat)?;
        Ok(flat)
    }

    fn flatten_into(&self, out: &mut Vec<Flow>, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(FlowError::Topology(format!(
                "containers nested deeper than {} levels below {}",
                MAX_NESTING, self.owner
            )));
        }

        for flow in &self.flows {
            self.check_declared_range(flow)?;
            let (Endpoint::Port(src), Endpoint::Port(dst)) = (&flow.src, &flow.dst) else {
                // Forwarding declarations are consumed by the parent.
                continue;
            };
            let sources = resolve_source(src, depth)?;
            let sinks = resolve_sink(dst, depth)?;
            for source in &sources {
                for sink in &sinks {
                    out.push(Flow::new(source.clone(), sink.clone()));
                }
            }
        }

        for element in self.elements() {
            if let Element::Hier(hier) = &element {
                hier.topology().flatten_into(out, depth + 1)?;
            }
        }
        Ok(())
    }

    fn check_declared_range(&self, flow: &DeclaredFlow) -> Result<()> {
        let src_ok = match &flow.src {
            Endpoint::External(index) => *index < self.owner_signature.inputs,
            Endpoint::Port(port) => port.index < port.element.signature().outputs,
        };
        let dst_ok = match &flow.dst {
            Endpoint::External(index) => *index < self.owner_signature.outputs,
            Endpoint::Port(port) => port.index < port.element.signature().inputs,
        };
        if src_ok && dst_ok {
            return Ok(());
        }
        Err(FlowError::Topology(format!(
            "port out of range in flow {} -> {} declared on {}",
            describe(&flow.src, &self.owner),
            describe(&flow.dst, &self.owner),
            self.owner
        )))
    }
}

fn describe(endpoint: &Endpoint, owner: &ElementId) -> String {
    match endpoint {
        Endpoint::External(index) => format!("{}:{}", owner, index),
        Endpoint::Port(port) => port.to_string(),
    }
}

/// Distinct blocks must not share an id, since ports compare by id.
fn check_unique_ids(flat: &[Flow]) -> Result<()> {
    let mut owners: HashMap<&ElementId, &Element> = HashMap::new();
    for port in flat.iter().flat_map(|flow| [&flow.src, &flow.dst]) {
        let owner = owners.entry(port.id()).or_insert(&port.element);
        if !owner.same_as(&port.element) {
            return Err(FlowError::Topology(format!(
                "blocks '{}' and '{}' share id {}",
                owner.name(),
                port.element.name(),
                port.id()
            )));
        }
    }
    Ok(())
}

fn check_single_driver(flat: &[Flow]) -> Result<()> {
    let mut drivers: HashMap<&Port, &Port> = HashMap::new();
    for flow in flat {
        check_leaf_range(flow)?;
        if let Some(existing) = drivers.insert(&flow.dst, &flow.src) {
            return Err(FlowError::Topology(format!(
                "input {} is driven by both {} and {}",
                flow.dst, existing, flow.src
            )));
        }
    }
    Ok(())
}

fn check_leaf_range(flow: &Flow) -> Result<()> {
    let src = flow.src.element.signature();
    let dst = flow.dst.element.signature();
    if flow.src.index >= src.outputs || flow.dst.index >= dst.inputs {
        return Err(FlowError::Topology(format!("port out of range in flow {}", flow)));
    }
    Ok(())
}

/// Leaf output ports behind output `port`.
fn resolve_source(port: &Port, depth: usize) -> Result<Vec<Port>> {
    let Element::Hier(hier) = &port.element else {
        return Ok(vec![port.clone()]);
    };
    if depth > MAX_NESTING {
        return Err(FlowError::Topology(format!(
            "containers nested deeper than {} levels at {}",
            MAX_NESTING, port
        )));
    }

    let inner = hier.topology();
    let mut out = Vec::new();
    for flow in inner.declared() {
        if flow.dst != Endpoint::External(port.index) {
            continue;
        }
        match &flow.src {
            Endpoint::External(input) => {
                return Err(FlowError::Topology(format!(
                    "{} passes input {} straight to output {}",
                    hier.name(),
                    input,
                    port.index
                )));
            }
            Endpoint::Port(src) => out.extend(resolve_source(src, depth + 1)?),
        }
    }

    if out.is_empty() {
        return Err(FlowError::Topology(format!(
            "output {} of {} is not connected inside",
            port.index,
            hier.name()
        )));
    }
    Ok(out)
}

/// Leaf input ports behind input `port`.
fn resolve_sink(port: &Port, depth: usize) -> Result<Vec<Port>> {
    let Element::Hier(hier) = &port.element else {
        return Ok(vec![port.clone()]);
    };
    if depth > MAX_NESTING {
        return Err(FlowError::Topology(format!(
            "containers nested deeper than {} levels at {}",
            MAX_NESTING, port
        )));
    }

    let inner = hier.topology();
    let mut out = Vec::new();
    for flow in inner.declared() {
        if flow.src != Endpoint::External(port.index) {
            continue;
        }
        match &flow.dst {
            Endpoint::External(output) => {
                return Err(FlowError::Topology(format!(
                    "{} passes input {} straight to output {}",
                    hier.name(),
                    port.index,
                    output
                )));
            }
            Endpoint::Port(dst) => out.extend(resolve_sink(dst, depth + 1)?),
        }
    }

    if out.is_empty() {
        return Err(FlowError::Topology(format!(
            "input {} of {} is not connected inside",
            port.index,
            hier.name()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{Block, WorkIo};
    use crate::core::topology::HierBlock;

    struct Stub(IoSignature);

    impl Block for Stub {
        fn signature(&self) -> IoSignature {
            self.0
        }

        fn work(&mut self, _io: &mut WorkIo<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn leaf(name: &str, inputs: usize, outputs: usize) -> Element {
        Element::block(name, Stub(IoSignature::new(inputs, outputs)))
    }

    fn top() -> Topology {
        Topology::new(ElementId::new_top(), IoSignature::new(0, 0))
    }

    #[test]
    fn test_resolve_flat_graph_keeps_order() {
        let a = leaf("a", 0, 2);
        let b = leaf("b", 1, 0);
        let c = leaf("c", 1, 0);

        let mut topology = top();
        assert!(topology.connect(Flow::between(&a, 1, &c, 0)));
        assert!(topology.connect(Flow::between(&a, 0, &b, 0)));
        assert!(!topology.connect(Flow::between(&a, 0, &b, 0)));

        let flat = topology.resolve().unwrap();
        assert_eq!(
            flat,
            vec![Flow::between(&a, 1, &c, 0), Flow::between(&a, 0, &b, 0)]
        );
        assert_eq!(flat, topology.resolve().unwrap());
        assert_eq!(topology.elements().len(), 3);
    }

    #[test]
    fn test_resolve_rejects_out_of_range_ports() {
        let a = leaf("a", 0, 1);
        let b = leaf("b", 1, 0);

        let mut topology = top();
        topology.connect(Flow::between(&a, 3, &b, 0));
        assert!(matches!(topology.resolve(), Err(FlowError::Topology(_))));

        topology.disconnect_all();
        topology.connect(Flow::between(&a, 0, &b, 1));
        assert!(matches!(topology.resolve(), Err(FlowError::Topology(_))));
    }

    #[test]
    fn test_resolve_rejects_second_driver() {
        let a = leaf("a", 0, 1);
        let b = leaf("b", 0, 1);
        let sink = leaf("sink", 1, 0);

        let mut topology = top();
        topology.connect(Flow::between(&a, 0, &sink, 0));
        topology.connect(Flow::between(&b, 0, &sink, 0));
        let err = topology.resolve().unwrap_err();
        assert!(err.to_string().contains("driven by both"));
    }

    #[test]
    fn test_resolve_rejects_distinct_blocks_sharing_an_id() {
        let first = Element::block_with_id("X", "first", Stub(IoSignature::source(1)));
        let second = Element::block_with_id("X", "second", Stub(IoSignature::source(1)));
        let s1 = leaf("s1", 1, 0);
        let s2 = leaf("s2", 1, 0);

        let mut topology = top();
        topology.connect(Flow::between(&first, 0, &s1, 0));
        topology.connect(Flow::between(&second, 0, &s2, 0));
        let err = topology.resolve().unwrap_err();
        assert!(matches!(err, FlowError::Topology(_)));
        assert!(err.to_string().contains("share id X"));

        // The same block reached through two clones is fine.
        topology.disconnect_all();
        topology.connect(Flow::between(&first, 0, &s1, 0));
        topology.connect(Flow::between(&first.clone(), 0, &s2, 0));
        assert_eq!(topology.resolve().unwrap().len(), 2);
    }

    #[test]
    fn test_disconnect_unknown_flow() {
        let a = leaf("a", 0, 1);
        let b = leaf("b", 1, 0);
        let mut topology = top();

        assert!(!topology.disconnect(&Flow::between(&a, 0, &b, 0)));
        topology.connect(Flow::between(&a, 0, &b, 0));
        assert!(topology.disconnect(&Flow::between(&a, 0, &b, 0)));
        assert!(topology.is_empty());
    }

    #[test]
    fn test_unforwarded_container_port_fails() {
        let hier = HierBlock::new("empty", IoSignature::new(1, 1));
        let src = leaf("src", 0, 1);

        let mut topology = top();
        topology.connect(Flow::new(src.port(0), hier.port(0)));
        let err = topology.resolve().unwrap_err();
        assert!(err.to_string().contains("not connected inside"));
    }

    #[test]
    fn test_pass_through_container_fails() {
        let hier = HierBlock::new("wire", IoSignature::new(1, 1));
        hier.connect_flow(Flow::new(hier.port(0), hier.port(0)));
        let src = leaf("src", 0, 1);
        let dst = leaf("dst", 1, 0);

        let mut topology = top();
        topology.connect(Flow::new(src.port(0), hier.port(0)));
        topology.connect(Flow::new(hier.port(0), dst.port(0)));
        assert!(matches!(topology.resolve(), Err(FlowError::Topology(_))));
    }

    #[test]
    fn test_self_containing_container_stops() {
        let hier = HierBlock::new("loop", IoSignature::new(0, 1));
        let inner = HierBlock::new("inner", IoSignature::new(0, 1));
        inner.connect_flow(Flow::new(hier.port(0), inner.port(0)));
        hier.connect_flow(Flow::new(inner.port(0), hier.port(0)));
        let dst = leaf("dst", 1, 0);

        let mut topology = top();
        topology.connect(Flow::new(hier.port(0), dst.port(0)));
        assert!(matches!(topology.resolve(), Err(FlowError::Topology(_))));
    }
}
