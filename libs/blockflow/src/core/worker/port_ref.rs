// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use super::Worker;
use crate::core::element::ElementId;

/// Far end of one connection, as stored in a worker's tables.
///
/// Holds the peer weakly so wired workers never keep each other alive.
#[derive(Clone)]
pub struct PortRef {
    pub id: ElementId,
    pub index: usize,
    worker: Weak<Worker>,
}

impl PortRef {
    pub fn new(worker: &Arc<Worker>, index: usize) -> Self {
        Self {
            id: worker.id().clone(),
            index,
            worker: Arc::downgrade(worker),
        }
    }

    pub fn worker(&self) -> Option<Arc<Worker>> {
        self.worker.upgrade()
    }
}

impl PartialEq for PortRef {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.id == other.id
    }
}

impl Eq for PortRef {}

impl Hash for PortRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.index)
    }
}

/// Per-port connection lists of one worker.
///
/// `inputs[i]` lists the upstream outputs feeding input port `i`;
/// `outputs[o]` lists the downstream inputs fed by output port `o`.
/// Both grow on demand when an index beyond the current length is wired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionTables {
    pub inputs: Vec<Vec<PortRef>>,
    pub outputs: Vec<Vec<PortRef>>,
}

impl ConnectionTables {
    pub fn with_ports(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs: vec![Vec::new(); inputs],
            outputs: vec![Vec::new(); outputs],
        }
    }

    pub fn add_input(&mut self, port: usize, peer: PortRef) {
        push_at(&mut self.inputs, port, peer);
    }

    pub fn add_output(&mut self, port: usize, peer: PortRef) {
        push_at(&mut self.outputs, port, peer);
    }

    /// Erase one occurrence of `peer` from input `port`. Returns whether it was present.
    pub fn remove_input(&mut self, port: usize, peer: &PortRef) -> bool {
        erase_at(&mut self.inputs, port, peer)
    }

    pub fn remove_output(&mut self, port: usize, peer: &PortRef) -> bool {
        erase_at(&mut self.outputs, port, peer)
    }

    /// Input ports with at least one upstream source.
    pub fn connected_inputs(&self) -> usize {
        self.inputs.iter().filter(|peers| !peers.is_empty()).count()
    }

    pub fn connected_outputs(&self) -> usize {
        self.outputs.iter().filter(|peers| !peers.is_empty()).count()
    }

    pub fn is_unwired(&self) -> bool {
        self.connected_inputs() == 0 && self.connected_outputs() == 0
    }
}

fn push_at(table: &mut Vec<Vec<PortRef>>, port: usize, peer: PortRef) {
    if table.len() <= port {
        table.resize_with(port + 1, Vec::new);
    }
    table[port].push(peer);
}

fn erase_at(table: &mut [Vec<PortRef>], port: usize, peer: &PortRef) -> bool {
    let Some(peers) = table.get_mut(port) else {
        return false;
    };
    match peers.iter().position(|p| p == peer) {
        Some(pos) => {
            peers.remove(pos);
            true
        }
        None => false,
    }
}
