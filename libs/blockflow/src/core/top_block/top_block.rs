// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::query::{self, QueryRequest};
use crate::core::config::RuntimeConfig;
use crate::core::element::{Element, ElementId, IoSignature};
use crate::core::error::Result;
use crate::core::executor::{CommitResult, Executor};
use crate::core::flow::Flow;
use crate::core::pool::ThreadPool;
use crate::core::thread_group::ThreadGroup;
use crate::core::token::Token;
use crate::core::topology::{Endpoint, Topology};
use crate::core::worker::{Worker, WorkerMessage, WorkerResources};

/// Root of a block graph and its lifecycle controller.
///
/// Declare flows with [`connect`](TopBlock::connect), then drive the graph
/// with `start`/`wait`/`stop`. Every start commits the declared graph
/// incrementally, so calling it again on a running graph only applies the
/// edits made since.
pub struct TopBlock {
    id: ElementId,
    name: String,
    config: RuntimeConfig,
    topology: Arc<RwLock<Topology>>,
    executor: Mutex<Executor>,
    token: Mutex<Token>,
    run: AtomicU64,
    buffer_hint: AtomicUsize,
    thread_group: ThreadGroup,
    pool: ThreadPool,
}

impl TopBlock {
    /// A top block on the process-wide pool with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), RuntimeConfig::default(), ThreadPool::default_pool())
    }

    /// A top block configured by `config`, with a dedicated pool when
    /// `worker_threads` is set.
    pub fn with_config(name: impl Into<String>, config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let name = name.into();
        let pool = match config.worker_threads {
            Some(threads) => ThreadPool::new(format!("{}-worker", name), threads)?,
            None => ThreadPool::default_pool(),
        };
        Ok(Self::build(name, config, pool))
    }

    fn build(name: String, config: RuntimeConfig, pool: ThreadPool) -> Self {
        let id = ElementId::new_top();
        let topology = Arc::new(RwLock::new(Topology::new(id.clone(), IoSignature::new(0, 0))));
        tracing::info!("[{}] Created top block '{}'", id, name);
        Self {
            executor: Mutex::new(Executor::new(Arc::clone(&topology))),
            thread_group: ThreadGroup::new(format!("{}-helper", name)),
            token: Mutex::new(Token::new()),
            run: AtomicU64::new(0),
            buffer_hint: AtomicUsize::new(0),
            id,
            name,
            config,
            topology,
            pool,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    pub fn thread_group(&self) -> &ThreadGroup {
        &self.thread_group
    }

    // =========================================================================
    // Declaration
    // =========================================================================

    /// Declare a flow. Returns false if it is already declared.
    pub fn connect(&self, src: &Element, src_index: usize, dst: &Element, dst_index: usize) -> bool {
        self.connect_flow(Flow::between(src, src_index, dst, dst_index))
    }

    pub fn connect_flow(&self, flow: Flow) -> bool {
        self.topology.write().connect(flow)
    }

    pub fn disconnect(&self, src: &Element, src_index: usize, dst: &Element, dst_index: usize) -> bool {
        self.topology
            .write()
            .disconnect(&Flow::between(src, src_index, dst, dst_index))
    }

    pub fn disconnect_all(&self) {
        self.topology.write().disconnect_all();
    }

    /// Declared flows in declaration order.
    pub fn flows(&self) -> Vec<Flow> {
        self.topology
            .read()
            .declared()
            .iter()
            .filter_map(|d| match (&d.src, &d.dst) {
                (Endpoint::Port(src), Endpoint::Port(dst)) => {
                    Some(Flow::new(src.clone(), dst.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Resolved flows of the last commit.
    pub fn flat_flows(&self) -> Vec<Flow> {
        self.executor.lock().flat_flows().to_vec()
    }

    /// Workers of the last commit.
    pub fn workers(&self) -> Vec<Arc<Worker>> {
        self.executor.lock().workers().to_vec()
    }

    /// Apply declaration edits to the workers without starting them.
    pub fn commit(&self) -> Result<CommitResult> {
        self.executor.lock().commit()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Re-run [`start`](TopBlock::start). Safe on a running graph.
    pub fn update(&self) -> Result<()> {
        self.start()
    }

    /// Commit, hand out resources and a fresh token, allocate, activate.
    pub fn start(&self) -> Result<()> {
        let executor = self.executor_committed()?;

        self.thread_group.reset();
        executor.post_all(WorkerMessage::Resources(WorkerResources {
            pool: self.pool.clone(),
            thread_group: self.thread_group.clone(),
            default_buffer_size: self.config.default_buffer_size,
            mailbox_batch: self.config.mailbox_batch,
        }));
        executor.post_all(WorkerMessage::Hint(self.buffer_hint.load(Ordering::Acquire)));

        // Swap before handing out clones, so no waiter can see the old
        // token settle while it is still the current one.
        let run = self.run.fetch_add(1, Ordering::AcqRel) + 1;
        let token = Token::new();
        drop(std::mem::replace(&mut *self.token.lock(), token.clone()));
        executor.post_all(WorkerMessage::Token { token, run });

        executor.post_all(WorkerMessage::Alloc);
        executor.post_all(WorkerMessage::Active);

        tracing::info!(
            "[{}] Started run {} with {} workers",
            self.id,
            run,
            executor.workers().len()
        );
        Ok(())
    }

    fn executor_committed(&self) -> Result<parking_lot::MutexGuard<'_, Executor>> {
        let mut executor = self.executor.lock();
        executor.commit()?;
        Ok(executor)
    }

    /// Set the buffer hint, then [`start`](TopBlock::start).
    pub fn start_with_hint(&self, hint: usize) -> Result<()> {
        self.buffer_hint.store(hint, Ordering::Release);
        self.start()
    }

    /// Interrupt helper threads and send every worker inert.
    pub fn stop(&self) {
        self.thread_group.interrupt_all();
        let reached = self.executor.lock().post_all(WorkerMessage::Inert);
        tracing::info!("[{}] Stopping {} workers", self.id, reached);
    }

    /// [`start`](TopBlock::start), then block until completion.
    pub fn run(&self) -> Result<()> {
        self.start()?;
        self.wait();
        Ok(())
    }

    pub fn run_with_hint(&self, hint: usize) -> Result<()> {
        self.start_with_hint(hint)?;
        self.wait();
        Ok(())
    }

    /// Block until every worker released its token.
    ///
    /// Never returns if a block keeps working forever; use
    /// [`wait_timeout`](TopBlock::wait_timeout) or [`stop`](TopBlock::stop).
    pub fn wait(&self) {
        self.wait_until(None);
        tracing::debug!("[{}] Run complete", self.id);
    }

    /// Block until completion or `timeout_secs` elapsed. Returns whether the
    /// run completed.
    ///
    /// Zero, negative and NaN timeouts only check once. Timeouts too large
    /// to represent wait without a deadline.
    pub fn wait_timeout(&self, timeout_secs: f64) -> bool {
        let deadline = if timeout_secs > 0.0 {
            Duration::try_from_secs_f64(timeout_secs)
                .ok()
                .and_then(|timeout| Instant::now().checked_add(timeout))
        } else {
            Some(Instant::now())
        };
        self.wait_until(deadline)
    }

    /// Wait on the current token one poll interval at a time.
    ///
    /// A start in the meantime swaps the token, so it is re-read every
    /// round. Completion counts only when the token that settled is still
    /// the current one.
    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let poll = self.config.wait_poll_interval();
        loop {
            let watch = self.token.lock().watch();
            let round = Instant::now() + poll;
            let round = deadline.map_or(round, |deadline| round.min(deadline));
            if watch.wait_unique(Some(round), poll) {
                let current = self.token.lock();
                if watch.watches(&current) && current.is_unique() {
                    return true;
                }
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
        }
    }

    /// True when no worker holds the current token.
    pub fn is_done(&self) -> bool {
        self.token.lock().is_unique()
    }

    /// Preferred output buffer size in bytes. Takes effect at the next allocation.
    pub fn set_buffer_hint(&self, hint: usize) {
        self.buffer_hint.store(hint, Ordering::Release);
        self.executor.lock().post_all(WorkerMessage::Hint(hint));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Answer a JSON query document with a JSON document.
    ///
    /// Paths: `/blocks.json`, `/stats.json` (optional `blocks` filter) and
    /// `/props.json` (`block`, `key`, `action` of `get` or `set`, `value`).
    pub fn query(&self, request: &str) -> Result<String> {
        let request: Value = serde_json::from_str(request)?;
        let response = self.query_value(&request);
        Ok(serde_json::to_string(&response)?)
    }

    pub fn query_value(&self, request: &Value) -> Value {
        match QueryRequest::from_value(request) {
            Ok(request) => {
                // The lock only guards the worker list; replies come from actors.
                let executor = self.executor.lock();
                query::execute(&executor, &self.pool, &request)
            }
            Err(e) => {
                tracing::warn!("Malformed query: {}", e);
                Value::Object(serde_json::Map::new())
            }
        }
    }
}

impl std::fmt::Debug for TopBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopBlock")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Drop for TopBlock {
    fn drop(&mut self) {
        if !self.is_done() {
            tracing::debug!("[{}] Dropped while running, stopping", self.id);
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_top_block_is_done() {
        let top = TopBlock::new("empty");
        top.start().unwrap();
        assert!(top.wait_timeout(1.0));
        assert!(top.is_done());
        assert!(top.workers().is_empty());
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = RuntimeConfig {
            mailbox_batch: 0,
            ..Default::default()
        };
        assert!(TopBlock::with_config("bad", config).is_err());
    }

    #[test]
    fn test_negative_timeout_returns_immediately() {
        let top = TopBlock::new("idle");
        assert!(top.wait_timeout(-1.0));
        assert!(top.wait_timeout(f64::NAN));
        assert!(top.wait_timeout(f64::INFINITY));
    }

    #[test]
    fn test_start_swaps_the_token() {
        let top = TopBlock::new("swap");
        let before = top.token.lock().watch();
        top.start().unwrap();
        assert!(!before.watches(&top.token.lock()));
        assert!(top.is_done());
    }
}
