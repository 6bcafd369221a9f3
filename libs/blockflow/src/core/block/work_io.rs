// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::VecDeque;

use bytes::Bytes;

/// Port access for a single [`Block::work`](super::Block::work) call.
pub struct WorkIo<'a> {
    inputs: &'a mut [VecDeque<Bytes>],
    inputs_done: &'a [bool],
    output_sizes: &'a [usize],
    consumed: Vec<usize>,
    produced: Vec<Vec<Bytes>>,
    done: bool,
}

impl<'a> WorkIo<'a> {
    pub(crate) fn new(
        inputs: &'a mut [VecDeque<Bytes>],
        inputs_done: &'a [bool],
        output_sizes: &'a [usize],
    ) -> Self {
        let num_inputs = inputs.len();
        let num_outputs = output_sizes.len();
        Self {
            inputs,
            inputs_done,
            output_sizes,
            consumed: vec![0; num_inputs],
            produced: vec![Vec::new(); num_outputs],
            done: false,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.output_sizes.len()
    }

    /// Bytes queued on an input port.
    pub fn input_available(&self, port: usize) -> usize {
        self.inputs
            .get(port)
            .map(|queue| queue.iter().map(Bytes::len).sum())
            .unwrap_or(0)
    }

    pub fn peek_input(&self, port: usize) -> Option<&Bytes> {
        self.inputs.get(port).and_then(|queue| queue.front())
    }

    /// Take the oldest buffer queued on an input port.
    pub fn pop_input(&mut self, port: usize) -> Option<Bytes> {
        let buffer = self.inputs.get_mut(port)?.pop_front()?;
        self.consumed[port] += buffer.len();
        Some(buffer)
    }

    /// Put back the unconsumed tail of a popped buffer.
    pub fn push_back_input(&mut self, port: usize, rest: Bytes) {
        if let Some(queue) = self.inputs.get_mut(port) {
            self.consumed[port] = self.consumed[port].saturating_sub(rest.len());
            queue.push_front(rest);
        }
    }

    /// True once the upstream producer of `port` went inert.
    pub fn input_done(&self, port: usize) -> bool {
        self.inputs_done.get(port).copied().unwrap_or(true)
    }

    /// Emit a buffer on an output port. Out-of-range ports are dropped.
    pub fn produce(&mut self, port: usize, data: Bytes) {
        match self.produced.get_mut(port) {
            Some(out) => out.push(data),
            None => tracing::warn!("produce on unknown output port {}, dropped", port),
        }
    }

    /// Allocated buffer size of an output port.
    pub fn output_buffer_size(&self, port: usize) -> usize {
        self.output_sizes.get(port).copied().unwrap_or(0)
    }

    /// Finish this block. The worker goes inert after the call returns.
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    pub(crate) fn consumed(&self) -> &[usize] {
        &self.consumed
    }

    pub(crate) fn take_produced(&mut self) -> Vec<Vec<Bytes>> {
        std::mem::take(&mut self.produced)
    }
}
