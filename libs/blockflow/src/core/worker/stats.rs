// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::Serialize;

/// Execution counters of one worker. Times are in [`time_now`](crate::time_now) ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockStats {
    pub tps: u64,
    /// When this snapshot was taken.
    pub stats_time: u64,
    pub init_time: u64,
    pub start_time: u64,
    pub stop_time: u64,
    pub work_count: u64,
    pub time_last_work: u64,
    pub total_time_work: u64,
    pub actor_queue_depth: usize,
    pub bytes_copied: u64,
    pub items_enqueued: Vec<u64>,
    pub items_consumed: Vec<u64>,
    pub items_produced: Vec<u64>,
    pub inputs_idle: Vec<bool>,
    pub outputs_idle: Vec<bool>,
}

impl BlockStats {
    pub(crate) fn new(inputs: usize, outputs: usize, init_time: u64) -> Self {
        Self {
            tps: crate::core::time::time_tps(),
            init_time,
            items_enqueued: vec![0; inputs],
            items_consumed: vec![0; inputs],
            items_produced: vec![0; outputs],
            inputs_idle: vec![true; inputs],
            outputs_idle: vec![true; outputs],
            ..Default::default()
        }
    }

    /// Grow the per-port vectors to cover the given port counts.
    pub(crate) fn ensure_ports(&mut self, inputs: usize, outputs: usize) {
        if self.items_enqueued.len() < inputs {
            self.items_enqueued.resize(inputs, 0);
            self.items_consumed.resize(inputs, 0);
            self.inputs_idle.resize(inputs, true);
        }
        if self.items_produced.len() < outputs {
            self.items_produced.resize(outputs, 0);
            self.outputs_idle.resize(outputs, true);
        }
    }

    pub fn total_items_consumed(&self) -> u64 {
        self.items_consumed.iter().sum()
    }

    pub fn total_items_produced(&self) -> u64 {
        self.items_produced.iter().sum()
    }
}
