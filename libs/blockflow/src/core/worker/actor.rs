// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Message handling for one worker.
//!
//! The actor is only ever touched by the pool thread currently draining
//! the worker's mailbox, so it owns the block and all per-run state without
//! further synchronization.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use super::message::{PropAccess, WorkerResources};
use super::stats::BlockStats;
use super::worker::{Worker, WorkerState};
use super::{PortRef, WorkerMessage};
use crate::core::block::{Block, BlockContext, WorkIo};
use crate::core::buffers;
use crate::core::element::{ElementId, IoSignature};
use crate::core::time::time_now;
use crate::core::token::Token;

pub(crate) struct Actor {
    block: Box<dyn Block>,
    signature: IoSignature,
    state: WorkerState,
    /// Run number of the state below. Older data is discarded.
    run: u64,
    /// Set once the worker went inert in the current run.
    retired: bool,
    token: Option<Token>,
    resources: Option<WorkerResources>,
    hint: usize,
    output_sizes: Vec<usize>,
    reserved: Vec<BytesMut>,
    input_sources: Vec<Vec<PortRef>>,
    outputs: Vec<Vec<PortRef>>,
    queues: Vec<VecDeque<Bytes>>,
    inputs_done: Vec<bool>,
    downstream_done: Vec<Vec<bool>>,
    work_pending: bool,
    stats: BlockStats,
}

impl Actor {
    pub(crate) fn new(block: Box<dyn Block>, signature: IoSignature, init_time: u64) -> Self {
        Self {
            block,
            signature,
            state: WorkerState::Inert,
            run: 0,
            retired: false,
            token: None,
            resources: None,
            hint: 0,
            output_sizes: Vec::new(),
            reserved: Vec::new(),
            input_sources: vec![Vec::new(); signature.inputs],
            outputs: vec![Vec::new(); signature.outputs],
            queues: vec![VecDeque::new(); signature.inputs],
            inputs_done: vec![true; signature.inputs],
            downstream_done: vec![Vec::new(); signature.outputs],
            work_pending: false,
            stats: BlockStats::new(signature.inputs, signature.outputs, init_time),
        }
    }

    pub(crate) fn handle(&mut self, worker: &Worker, msg: WorkerMessage) {
        tracing::trace!("[{}] {:?}", worker.id(), msg);
        match msg {
            WorkerMessage::Topology => self.adopt_topology(worker),
            WorkerMessage::Resources(resources) => {
                worker.adopt_resources(resources.pool.clone(), resources.mailbox_batch);
                self.resources = Some(resources);
            }
            WorkerMessage::Token { token, run } => {
                if self.enter_run(worker, run) {
                    self.token = Some(token);
                }
            }
            WorkerMessage::Hint(hint) => self.hint = hint,
            WorkerMessage::Alloc => self.allocate(),
            WorkerMessage::Active => self.activate(worker),
            WorkerMessage::Inert => self.go_inert(worker, "requested"),
            WorkerMessage::Buffer { port, data, run } => self.accept_buffer(worker, port, data, run),
            WorkerMessage::UpstreamDone { port, run } => {
                if self.enter_run(worker, run) {
                    if let Some(done) = self.inputs_done.get_mut(port) {
                        *done = true;
                    }
                    self.wake(worker);
                }
            }
            WorkerMessage::DownstreamDone { port, peer, run } => {
                if self.enter_run(worker, run) {
                    self.mark_downstream_done(port, &peer);
                    self.wake(worker);
                }
            }
            WorkerMessage::Work => {
                self.work_pending = false;
                self.do_work(worker);
            }
            WorkerMessage::GetStats { reply } => {
                // The requester may have given up; nothing to do then.
                let _ = reply.send((worker.id().clone(), self.snapshot_stats(worker)));
            }
            WorkerMessage::PropAccess(access) => self.access_property(access),
        }
    }

    /// Move to `run` if it is newer. Returns false for stale messages.
    fn enter_run(&mut self, worker: &Worker, run: u64) -> bool {
        if run < self.run {
            return false;
        }
        if run > self.run {
            self.run = run;
            if self.state == WorkerState::Inert {
                self.reset_run(worker);
            }
        }
        true
    }

    fn reset_run(&mut self, worker: &Worker) {
        let discarded: usize = self.queues.iter().map(VecDeque::len).sum();
        for queue in &mut self.queues {
            queue.clear();
        }
        worker.note_drained(discarded);

        for (port, done) in self.inputs_done.iter_mut().enumerate() {
            *done = self.input_sources.get(port).is_none_or(Vec::is_empty);
        }
        self.downstream_done = self
            .outputs
            .iter()
            .map(|peers| vec![false; peers.len()])
            .collect();
        self.retired = false;
    }

    fn adopt_topology(&mut self, worker: &Worker) {
        let tables = worker.tables();

        let num_inputs = tables.inputs.len().max(self.signature.inputs);
        self.queues.resize_with(num_inputs, VecDeque::new);
        self.inputs_done.resize(num_inputs, true);
        for (port, sources) in tables.inputs.iter().enumerate() {
            let previous = self.input_sources.get(port);
            if sources.is_empty() {
                self.inputs_done[port] = true;
            } else if previous != Some(sources) {
                self.inputs_done[port] = false;
            }
        }

        let downstream_done = tables
            .outputs
            .iter()
            .enumerate()
            .map(|(port, peers)| {
                peers
                    .iter()
                    .map(|peer| {
                        self.outputs
                            .get(port)
                            .and_then(|old| old.iter().position(|p| p == peer))
                            .and_then(|slot| self.downstream_done.get(port)?.get(slot).copied())
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .collect();
        self.downstream_done = downstream_done;

        let connected_inputs = tables.connected_inputs();
        let connected_outputs = tables.connected_outputs();
        let unwired = tables.is_unwired();
        self.input_sources = tables.inputs;
        self.outputs = tables.outputs;
        self.stats.ensure_ports(num_inputs, self.outputs.len());

        if let Err(e) = self.block.notify_topology(connected_inputs, connected_outputs) {
            tracing::warn!("[{}] topology notification failed: {}", worker.id(), e);
        }

        if self.state == WorkerState::Active {
            if unwired {
                self.go_inert(worker, "disconnected");
            } else {
                self.wake(worker);
            }
        }
    }

    fn allocate(&mut self) {
        let default_size = self
            .resources
            .as_ref()
            .map(|r| r.default_buffer_size)
            .unwrap_or(4096);
        self.release_reserved();

        let num_outputs = self.outputs.len().max(self.signature.outputs);
        self.output_sizes = (0..num_outputs)
            .map(|_| buffers::buffer_size(self.hint, default_size))
            .collect();
        self.reserved = self
            .output_sizes
            .iter()
            .map(|size| buffers::allocate(*size))
            .collect();
    }

    fn release_reserved(&mut self) {
        for buffer in self.reserved.drain(..) {
            buffers::release(buffer.len());
        }
    }

    fn activate(&mut self, worker: &Worker) {
        if self.state == WorkerState::Active || self.retired {
            return;
        }
        if self.output_sizes.len() < self.outputs.len().max(self.signature.outputs) {
            self.allocate();
        }

        self.state = WorkerState::Active;
        worker.set_state(WorkerState::Active);
        self.stats.start_time = time_now();

        let ctx = BlockContext {
            thread_group: self.resources.as_ref().map(|r| r.thread_group.clone()),
            output_buffer_sizes: self.output_sizes.clone(),
        };
        if let Err(e) = self.block.activate(&ctx) {
            tracing::warn!("[{}] activation failed: {}", worker.id(), e);
            self.go_inert(worker, "activation failed");
            return;
        }

        tracing::debug!("[{}] Active", worker.id());
        self.wake(worker);
    }

    fn go_inert(&mut self, worker: &Worker, reason: &str) {
        if self.state != WorkerState::Active {
            self.token = None;
            return;
        }

        if let Err(e) = self.block.deactivate() {
            tracing::warn!("[{}] deactivation failed: {}", worker.id(), e);
        }
        self.state = WorkerState::Inert;
        self.retired = true;
        self.stats.stop_time = time_now();
        self.release_reserved();

        for peers in &self.outputs {
            for peer in peers {
                if let Some(consumer) = peer.worker() {
                    consumer.post(WorkerMessage::UpstreamDone {
                        port: peer.index,
                        run: self.run,
                    });
                }
            }
        }
        for (port, sources) in self.input_sources.iter().enumerate() {
            for source in sources {
                if let Some(producer) = source.worker() {
                    producer.post(WorkerMessage::DownstreamDone {
                        port: source.index,
                        peer: (worker.id().clone(), port),
                        run: self.run,
                    });
                }
            }
        }

        let discarded: usize = self.queues.iter().map(VecDeque::len).sum();
        for queue in &mut self.queues {
            queue.clear();
        }
        worker.note_drained(discarded);
        self.release_upstream_throttles();

        worker.set_state(WorkerState::Inert);
        // Released last so a finished wait() sees every worker inert.
        self.token = None;
        tracing::debug!("[{}] Inert ({})", worker.id(), reason);
    }

    fn accept_buffer(&mut self, worker: &Worker, port: usize, data: Bytes, run: u64) {
        if !self.enter_run(worker, run) || self.retired || port >= self.queues.len() {
            worker.note_drained(1);
            return;
        }
        self.stats.items_enqueued[port] += self.signature.items(data.len());
        self.queues[port].push_back(data);
        self.wake(worker);
    }

    fn mark_downstream_done(&mut self, port: usize, peer: &(ElementId, usize)) {
        let Some(peers) = self.outputs.get(port) else {
            return;
        };
        if let Some(slot) = peers
            .iter()
            .position(|p| p.id == peer.0 && p.index == peer.1)
        {
            if let Some(done) = self
                .downstream_done
                .get_mut(port)
                .and_then(|flags| flags.get_mut(slot))
            {
                *done = true;
            }
        }
    }

    fn wake(&mut self, worker: &Worker) {
        if self.state == WorkerState::Active && !self.work_pending {
            self.work_pending = true;
            worker.post(WorkerMessage::Work);
        }
    }

    fn connected_inputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.input_sources
            .iter()
            .enumerate()
            .filter(|(_, sources)| !sources.is_empty())
            .map(|(port, _)| port)
    }

    /// Every connected input reported done.
    fn inputs_exhausted(&self) -> bool {
        let mut ports = self.connected_inputs().peekable();
        ports.peek().is_some() && ports.all(|port| self.inputs_done[port])
    }

    fn has_queued_input(&self) -> bool {
        self.queues.iter().any(|queue| !queue.is_empty())
    }

    /// Every downstream connection reported done.
    fn outputs_exhausted(&self) -> bool {
        let mut flags = self.downstream_done.iter().flatten().peekable();
        flags.peek().is_some() && flags.all(|done| *done)
    }

    fn finished(&self) -> bool {
        (self.inputs_exhausted() && !self.has_queued_input()) || self.outputs_exhausted()
    }

    /// True when a live consumer has too much queued to accept more.
    fn downstream_backlogged(&self, worker: &Worker) -> bool {
        let backlogged = || {
            self.outputs.iter().enumerate().any(|(port, peers)| {
                peers.iter().enumerate().any(|(slot, peer)| {
                    !self.downstream_done[port][slot]
                        && peer.worker().is_some_and(|w| w.is_backlogged())
                })
            })
        };
        if !backlogged() {
            return false;
        }
        worker.set_throttled();
        backlogged()
    }

    fn release_upstream_throttles(&self) {
        for sources in &self.input_sources {
            for source in sources {
                if let Some(producer) = source.worker() {
                    producer.release_throttle();
                }
            }
        }
    }

    fn do_work(&mut self, worker: &Worker) {
        if self.state != WorkerState::Active {
            return;
        }
        if self.finished() {
            self.go_inert(worker, "complete");
            return;
        }
        if self.downstream_backlogged(worker) {
            return;
        }

        let queued_before: usize = self.queues.iter().map(VecDeque::len).sum();
        let started = time_now();
        let (result, done, consumed, produced) = {
            let mut io = WorkIo::new(&mut self.queues, &self.inputs_done, &self.output_sizes);
            let result = self.block.work(&mut io);
            let consumed = io.consumed().to_vec();
            (result, io.is_done(), consumed, io.take_produced())
        };
        let finished_at = time_now();

        self.stats.work_count += 1;
        self.stats.time_last_work = finished_at;
        self.stats.total_time_work += finished_at.saturating_sub(started);

        let queued_after: usize = self.queues.iter().map(VecDeque::len).sum();
        let drained = queued_before.saturating_sub(queued_after);
        if drained > 0 {
            worker.note_drained(drained);
            self.release_upstream_throttles();
        }

        let mut progress = false;
        for (port, bytes) in consumed.iter().enumerate() {
            if *bytes > 0 {
                progress = true;
                self.stats.items_consumed[port] += self.signature.items(*bytes);
            }
        }
        for (port, buffers) in produced.into_iter().enumerate() {
            self.stats.outputs_idle[port] = buffers.is_empty();
            for data in buffers {
                progress = true;
                self.stats.items_produced[port] += self.signature.items(data.len());
                self.stats.bytes_copied += data.len() as u64;
                self.dispatch(port, data);
            }
        }

        if let Err(e) = result {
            tracing::warn!("[{}] work failed: {}", worker.id(), e);
            self.go_inert(worker, "work failed");
            return;
        }
        if done || self.finished() || (!progress && self.inputs_exhausted()) {
            self.go_inert(worker, "complete");
            return;
        }

        let is_source = self.connected_inputs().next().is_none();
        if progress && (is_source || self.has_queued_input()) {
            self.wake(worker);
        }
    }

    /// Fan a produced buffer out to every live consumer of `port`.
    fn dispatch(&self, port: usize, data: Bytes) {
        let Some(peers) = self.outputs.get(port) else {
            return;
        };
        for (slot, peer) in peers.iter().enumerate() {
            if self.downstream_done[port][slot] {
                continue;
            }
            if let Some(consumer) = peer.worker() {
                consumer.note_enqueued();
                consumer.post(WorkerMessage::Buffer {
                    port: peer.index,
                    data: data.clone(),
                    run: self.run,
                });
            }
        }
    }

    fn snapshot_stats(&self, worker: &Worker) -> BlockStats {
        let mut stats = self.stats.clone();
        stats.stats_time = time_now();
        stats.actor_queue_depth = worker.mailbox_depth();
        for (port, idle) in stats.inputs_idle.iter_mut().enumerate() {
            *idle = self.queues.get(port).is_none_or(VecDeque::is_empty);
        }
        stats
    }

    fn access_property(&mut self, access: PropAccess) {
        let PropAccess { key, value, reply } = access;
        let result = match value {
            None => Ok(self.block.get_property(&key)),
            Some(value) => self.block.set_property(&key, value).map(|_| None),
        };
        let _ = reply.send(result);
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        self.release_reserved();
    }
}
