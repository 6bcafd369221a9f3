// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{CommitPhase, CommitResult, FlowDelta};
use crate::core::element::Port;
use crate::core::error::{FlowError, Result};
use crate::core::flow::Flow;
use crate::core::topology::Topology;
use crate::core::worker::{PortRef, Worker, WorkerMessage};

/// One flow with both endpoint workers looked up.
struct WiredFlow {
    src: Arc<Worker>,
    src_index: usize,
    dst: Arc<Worker>,
    dst_index: usize,
}

impl WiredFlow {
    fn new(flow: &Flow) -> Result<Self> {
        Ok(Self {
            src: leaf_worker(&flow.src)?,
            src_index: flow.src.index,
            dst: leaf_worker(&flow.dst)?,
            dst_index: flow.dst.index,
        })
    }
}

fn leaf_worker(port: &Port) -> Result<Arc<Worker>> {
    port.element.worker().cloned().ok_or_else(|| {
        FlowError::Topology(format!("{} is not a leaf block after resolve", port))
    })
}

/// Keeps live worker tables in step with the declared topology.
///
/// Holds the last committed flat flow set. Each [`commit`](Executor::commit)
/// resolves the topology again and applies only the difference, in four
/// phases so that both ends of every new flow exist before any removal.
pub struct Executor {
    topology: Arc<RwLock<Topology>>,
    flat_flows: Vec<Flow>,
    workers: Vec<Arc<Worker>>,
    broadcasts: AtomicU64,
}

impl Executor {
    pub fn new(topology: Arc<RwLock<Topology>>) -> Self {
        Self {
            topology,
            flat_flows: Vec::new(),
            workers: Vec::new(),
            broadcasts: AtomicU64::new(0),
        }
    }

    /// The committed flat flow set.
    pub fn flat_flows(&self) -> &[Flow] {
        &self.flat_flows
    }

    /// Unique workers of the committed set, first appearance first.
    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    pub fn find_worker(&self, id: &str) -> Option<&Arc<Worker>> {
        self.workers.iter().find(|w| w.id() == id)
    }

    /// Total broadcasts issued, commit phases included.
    pub fn broadcast_count(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    /// Reconcile worker tables with the current topology.
    ///
    /// Resolve or lookup failures leave tables and the committed set
    /// untouched.
    pub fn commit(&mut self) -> Result<CommitResult> {
        let resolved = self.topology.read().resolve()?;
        let delta = FlowDelta::compute(&self.flat_flows, &resolved);

        let mut result = CommitResult::default();
        if delta.is_empty() {
            tracing::debug!("No changes to commit");
            result.workers = self.workers.len();
            return Ok(result);
        }

        let added = delta
            .to_add
            .iter()
            .map(WiredFlow::new)
            .collect::<Result<Vec<_>>>()?;
        let removed = delta
            .to_remove
            .iter()
            .map(WiredFlow::new)
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Committing: +{} -{} flows",
            delta.to_add.len(),
            delta.to_remove.len()
        );

        for phase in CommitPhase::ALL {
            let flows = if phase.is_addition() { &added } else { &removed };
            let changed = self.run_phase(phase, flows);
            match phase {
                CommitPhase::AddInputs => result.inputs_added = changed,
                CommitPhase::AddOutputs => result.outputs_added = changed,
                CommitPhase::RemoveOutputs => result.outputs_removed = changed,
                CommitPhase::RemoveInputs => result.inputs_removed = changed,
            }
            if !flows.is_empty() {
                result.broadcasts += 1;
            }
        }

        self.flat_flows = resolved;
        self.rebuild_workers();
        result.workers = self.workers.len();

        tracing::info!("Commit complete: {}", result);
        Ok(result)
    }

    /// Apply one phase to its flows, then notify every touched worker.
    fn run_phase(&self, phase: CommitPhase, flows: &[WiredFlow]) -> usize {
        if flows.is_empty() {
            return 0;
        }
        tracing::debug!("[{}] Starting", phase);

        let mut touched: Vec<&Arc<Worker>> = Vec::new();
        let mut seen = HashSet::new();
        let mut changed = 0;

        for flow in flows {
            let target = match phase {
                CommitPhase::AddInputs => {
                    let peer = PortRef::new(&flow.src, flow.src_index);
                    flow.dst.with_tables(|t| t.add_input(flow.dst_index, peer));
                    changed += 1;
                    &flow.dst
                }
                CommitPhase::AddOutputs => {
                    let peer = PortRef::new(&flow.dst, flow.dst_index);
                    flow.src.with_tables(|t| t.add_output(flow.src_index, peer));
                    changed += 1;
                    &flow.src
                }
                CommitPhase::RemoveOutputs => {
                    let peer = PortRef::new(&flow.dst, flow.dst_index);
                    if flow.src.with_tables(|t| t.remove_output(flow.src_index, &peer)) {
                        changed += 1;
                    }
                    &flow.src
                }
                CommitPhase::RemoveInputs => {
                    let peer = PortRef::new(&flow.src, flow.src_index);
                    if flow.dst.with_tables(|t| t.remove_input(flow.dst_index, &peer)) {
                        changed += 1;
                    }
                    &flow.dst
                }
            };
            if seen.insert(target.id().clone()) {
                touched.push(target);
            }
        }

        for worker in &touched {
            worker.post(WorkerMessage::Topology);
        }
        self.broadcasts.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            "[{}] Completed ({} entries, {} workers notified)",
            phase,
            changed,
            touched.len()
        );
        changed
    }

    fn rebuild_workers(&mut self) {
        let mut seen = HashSet::new();
        let mut workers = Vec::new();
        for flow in &self.flat_flows {
            for port in [&flow.src, &flow.dst] {
                if let Some(worker) = port.element.worker() {
                    if seen.insert(worker.id().clone()) {
                        workers.push(Arc::clone(worker));
                    }
                }
            }
        }
        self.workers = workers;
    }

    /// Deliver `msg` to every committed worker. Returns the number reached.
    pub fn post_all(&self, msg: WorkerMessage) -> usize {
        for worker in &self.workers {
            worker.post(msg.clone());
        }
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Broadcast {:?} to {} workers", msg, self.workers.len());
        self.workers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{Block, WorkIo};
    use crate::core::element::{Element, ElementId, IoSignature};

    struct Stub(IoSignature);

    impl Block for Stub {
        fn signature(&self) -> IoSignature {
            self.0
        }

        fn work(&mut self, _io: &mut WorkIo<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn shared_topology() -> Arc<RwLock<Topology>> {
        Arc::new(RwLock::new(Topology::new(
            ElementId::new_top(),
            IoSignature::new(0, 0),
        )))
    }

    #[test]
    fn test_second_commit_is_noop() {
        let topology = shared_topology();
        let a = Element::block("a", Stub(IoSignature::source(1)));
        let b = Element::block("b", Stub(IoSignature::sink(1)));
        topology.write().connect(Flow::between(&a, 0, &b, 0));

        let mut executor = Executor::new(Arc::clone(&topology));
        let first = executor.commit().unwrap();
        assert_eq!(first.inputs_added, 1);
        assert_eq!(first.outputs_added, 1);
        assert_eq!(first.broadcasts, 2);
        assert_eq!(first.workers, 2);

        let before = executor.broadcast_count();
        let second = executor.commit().unwrap();
        assert!(!second.has_changes());
        assert_eq!(second.broadcasts, 0);
        assert_eq!(executor.broadcast_count(), before);
    }

    #[test]
    fn test_failed_resolve_keeps_committed_state() {
        let topology = shared_topology();
        let a = Element::block("a", Stub(IoSignature::source(1)));
        let b = Element::block("b", Stub(IoSignature::sink(1)));
        topology.write().connect(Flow::between(&a, 0, &b, 0));

        let mut executor = Executor::new(Arc::clone(&topology));
        executor.commit().unwrap();
        let committed = executor.flat_flows().to_vec();

        topology.write().connect(Flow::between(&a, 5, &b, 0));
        assert!(executor.commit().is_err());
        assert_eq!(executor.flat_flows(), committed.as_slice());
        assert_eq!(a.worker().unwrap().tables().outputs[0].len(), 1);
    }
}
