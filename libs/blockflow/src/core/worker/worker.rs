// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::actor::Actor;
use super::mailbox::Mailbox;
use super::{ConnectionTables, WorkerMessage};
use crate::core::block::{Block, PropertyRegistry};
use crate::core::element::{ElementId, IoSignature};
use crate::core::pool::{PoolStats, ThreadPool};
use crate::core::time::time_now;

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Inert,
    Active,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Active,
            _ => Self::Inert,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Inert => 0,
            Self::Active => 1,
        }
    }
}

/// Buffers queued at a consumer before its producers stop working.
pub(crate) const BACKLOG_LIMIT: usize = 256;

/// Runtime proxy for one leaf block.
///
/// The executor is the only writer of the connection tables. Everything
/// else reaches the block through [`post`](Worker::post).
pub struct Worker {
    id: ElementId,
    name: String,
    signature: IoSignature,
    properties: PropertyRegistry,
    init_time: u64,
    tables: Mutex<ConnectionTables>,
    mailbox: Mailbox,
    scheduled: AtomicBool,
    pool: Mutex<ThreadPool>,
    mailbox_batch: AtomicUsize,
    state: AtomicU8,
    backlog: AtomicUsize,
    throttled: AtomicBool,
    actor: Mutex<Actor>,
    self_ref: Weak<Worker>,
}

impl Worker {
    pub fn new(id: ElementId, name: String, block: Box<dyn Block>) -> Arc<Self> {
        let signature = block.signature();
        let properties = PropertyRegistry::from_specs(block.properties());
        let init_time = time_now();

        tracing::debug!("[{}] Created worker '{}'", id, name);

        Arc::new_cyclic(|self_ref| Self {
            tables: Mutex::new(ConnectionTables::with_ports(
                signature.inputs,
                signature.outputs,
            )),
            actor: Mutex::new(Actor::new(block, signature, init_time)),
            id,
            name,
            signature,
            properties,
            init_time,
            mailbox: Mailbox::new(),
            scheduled: AtomicBool::new(false),
            pool: Mutex::new(ThreadPool::default_pool()),
            mailbox_batch: AtomicUsize::new(64),
            state: AtomicU8::new(WorkerState::Inert.as_u8()),
            backlog: AtomicUsize::new(0),
            throttled: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> IoSignature {
        self.signature
    }

    /// Properties the block declared at construction.
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    pub fn init_time(&self) -> u64 {
        self.init_time
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Active
    }

    /// Copy of the current connection tables.
    pub fn tables(&self) -> ConnectionTables {
        self.tables.lock().clone()
    }

    pub(crate) fn with_tables<R>(&self, f: impl FnOnce(&mut ConnectionTables) -> R) -> R {
        f(&mut self.tables.lock())
    }

    pub fn mailbox_depth(&self) -> usize {
        self.mailbox.depth()
    }

    /// Enqueue a message and make sure the actor is scheduled.
    pub fn post(&self, msg: WorkerMessage) {
        let depth = self.mailbox.push(msg);
        let pool = self.pool.lock().clone();
        pool.stats().record_depth(depth);
        self.schedule(&pool);
    }

    fn schedule(&self, pool: &ThreadPool) {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.self_ref.upgrade() {
            Some(this) => pool.submit(this),
            None => self.scheduled.store(false, Ordering::SeqCst),
        }
    }

    /// Drain up to one batch of messages. Called by pool threads only.
    pub(crate) fn run_mailbox(&self, stats: &PoolStats) {
        let batch = self.mailbox_batch.load(Ordering::Relaxed).max(1);
        let mut processed = 0;
        {
            let mut actor = self.actor.lock();
            while processed < batch {
                let Some(msg) = self.mailbox.pop() else {
                    break;
                };
                actor.handle(self, msg);
                processed += 1;
            }
        }
        stats.record_processed(processed as u64);

        self.scheduled.store(false, Ordering::SeqCst);
        if !self.mailbox.is_empty() {
            if processed >= batch {
                stats.record_yield();
            }
            let pool = self.pool.lock().clone();
            self.schedule(&pool);
        }
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn adopt_resources(&self, pool: ThreadPool, mailbox_batch: usize) {
        *self.pool.lock() = pool;
        self.mailbox_batch.store(mailbox_batch.max(1), Ordering::Relaxed);
    }

    /// Count a buffer sent to this worker.
    pub(crate) fn note_enqueued(&self) {
        self.backlog.fetch_add(1, Ordering::SeqCst);
    }

    /// Count buffers this worker consumed or discarded.
    pub(crate) fn note_drained(&self, count: usize) {
        if count == 0 {
            return;
        }
        let _ = self
            .backlog
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(count))
            });
    }

    pub(crate) fn is_backlogged(&self) -> bool {
        self.backlog.load(Ordering::SeqCst) >= BACKLOG_LIMIT
    }

    /// Mark this producer as waiting for a consumer to drain.
    pub(crate) fn set_throttled(&self) {
        self.throttled.store(true, Ordering::SeqCst);
    }

    /// Wake this producer if it was waiting on a consumer.
    pub(crate) fn release_throttle(&self) {
        if self.throttled.swap(false, Ordering::SeqCst) {
            self.post(WorkerMessage::Work);
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
