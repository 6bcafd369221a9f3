// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared actor thread pool.
//!
//! A worker with pending mail is pushed onto the pool's run queue at most
//! once at a time. Pool threads pop scheduled workers and drain a bounded
//! batch of their messages, so one worker never runs on two threads while
//! different workers run in parallel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::core::error::{FlowError, Result};
use crate::core::worker::Worker;

/// Snapshot of the pool's framework counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounters {
    /// Messages handled by actors on this pool.
    pub messages_processed: u64,
    /// Times an actor gave up its thread with mail still queued.
    pub yields: u64,
    /// Pushes of scheduled workers onto the shared run queue.
    pub shared_pushes: u64,
    /// Deepest actor mailbox observed.
    pub mailbox_queue_max: u64,
}

#[derive(Default)]
pub(crate) struct PoolStats {
    messages_processed: AtomicU64,
    yields: AtomicU64,
    shared_pushes: AtomicU64,
    mailbox_queue_max: AtomicU64,
}

impl PoolStats {
    pub(crate) fn record_processed(&self, count: u64) {
        if count > 0 {
            self.messages_processed.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_yield(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_depth(&self, depth: usize) {
        self.mailbox_queue_max
            .fetch_max(depth as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolCounters {
        PoolCounters {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            yields: self.yields.load(Ordering::Relaxed),
            shared_pushes: self.shared_pushes.load(Ordering::Relaxed),
            mailbox_queue_max: self.mailbox_queue_max.load(Ordering::Relaxed),
        }
    }
}

struct PoolInner {
    name: String,
    threads: usize,
    run_queue: Sender<Arc<Worker>>,
    stats: Arc<PoolStats>,
}

/// Cloneable handle to a pool of actor threads.
///
/// Threads exit once every handle is dropped.
#[derive(Clone)]
pub struct ThreadPool {
    inner: Arc<PoolInner>,
}

static DEFAULT_POOL: LazyLock<ThreadPool> = LazyLock::new(|| {
    let threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let (pool, spawned) = ThreadPool::spawn_threads("blockflow-worker", threads);
    if spawned < threads {
        tracing::error!(
            "Default pool started {} of {} threads",
            spawned,
            threads
        );
    }
    pool
});

impl ThreadPool {
    /// Start a pool with `threads` named threads.
    pub fn new(name: impl Into<String>, threads: usize) -> Result<Self> {
        let name = name.into();
        if threads == 0 {
            return Err(FlowError::Configuration(format!(
                "pool '{}' needs at least one thread",
                name
            )));
        }

        let (pool, spawned) = Self::spawn_threads(&name, threads);
        if spawned == 0 {
            return Err(FlowError::Runtime(format!(
                "pool '{}' could not start any thread",
                name
            )));
        }
        Ok(pool)
    }

    /// The process-wide pool, sized by available parallelism.
    pub fn default_pool() -> ThreadPool {
        DEFAULT_POOL.clone()
    }

    fn spawn_threads(name: &str, threads: usize) -> (Self, usize) {
        let (sender, receiver) = unbounded::<Arc<Worker>>();
        let stats = Arc::new(PoolStats::default());

        let mut spawned = 0;
        for index in 0..threads {
            let receiver: Receiver<Arc<Worker>> = receiver.clone();
            let stats = Arc::clone(&stats);
            let result = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || {
                    for worker in receiver.iter() {
                        worker.run_mailbox(&stats);
                    }
                });
            match result {
                Ok(_) => spawned += 1,
                Err(e) => tracing::error!("[{}] failed to spawn thread {}: {}", name, index, e),
            }
        }

        tracing::debug!("[{}] started {} threads", name, spawned);

        let pool = Self {
            inner: Arc::new(PoolInner {
                name: name.to_string(),
                threads: spawned,
                run_queue: sender,
                stats,
            }),
        };
        (pool, spawned)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn threads(&self) -> usize {
        self.inner.threads
    }

    /// Queue a scheduled worker for execution.
    pub(crate) fn submit(&self, worker: Arc<Worker>) {
        self.inner.stats.shared_pushes.fetch_add(1, Ordering::Relaxed);
        if self.inner.run_queue.send(worker).is_err() {
            tracing::error!("[{}] run queue closed, worker dropped", self.inner.name);
        }
    }

    pub(crate) fn stats(&self) -> &PoolStats {
        &self.inner.stats
    }

    pub fn counters(&self) -> PoolCounters {
        self.inner.stats.snapshot()
    }

    pub fn same_as(&self, other: &ThreadPool) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.inner.name)
            .field("threads", &self.inner.threads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_threads_rejected() {
        assert!(ThreadPool::new("empty", 0).is_err());
    }

    #[test]
    fn test_dedicated_pool_is_distinct() {
        let pool = ThreadPool::new("dedicated", 2).unwrap();
        assert_eq!(pool.threads(), 2);
        assert_eq!(pool.name(), "dedicated");
        assert!(!pool.same_as(&ThreadPool::default_pool()));
        assert!(ThreadPool::default_pool().same_as(&ThreadPool::default_pool()));
        assert_eq!(pool.counters(), PoolCounters::default());
    }
}
