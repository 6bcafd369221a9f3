// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::SegQueue;

use super::WorkerMessage;

/// Two-lane multi-producer mailbox. The priority lane drains first.
pub(crate) struct Mailbox {
    priority: SegQueue<WorkerMessage>,
    normal: SegQueue<WorkerMessage>,
    depth: AtomicUsize,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self {
            priority: SegQueue::new(),
            normal: SegQueue::new(),
            depth: AtomicUsize::new(0),
        }
    }

    /// Enqueue a message and return the depth after the push.
    pub(crate) fn push(&self, msg: WorkerMessage) -> usize {
        if msg.is_priority() {
            self.priority.push(msg);
        } else {
            self.normal.push(msg);
        }
        self.depth.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn pop(&self) -> Option<WorkerMessage> {
        let msg = self.priority.pop().or_else(|| self.normal.pop())?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(msg)
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.normal.is_empty()
    }
}
