// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Helper threads owned by a top block.
//!
//! Blocks may spawn auxiliary threads through the group they receive on
//! activation. Interruption is cooperative: `interrupt_all()` raises a flag
//! each helper is expected to poll, then joins whatever has finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::core::error::{FlowError, Result};

struct ThreadGroupInner {
    name: String,
    interrupted: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Cloneable handle to a set of cooperative helper threads.
#[derive(Clone)]
pub struct ThreadGroup {
    inner: Arc<ThreadGroupInner>,
}

impl ThreadGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ThreadGroupInner {
                name: name.into(),
                interrupted: Arc::new(AtomicBool::new(false)),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Spawn a helper thread. The closure receives the interrupt flag.
    pub fn spawn<F>(&self, label: &str, f: F) -> Result<()>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let flag = Arc::clone(&self.inner.interrupted);
        let handle = thread::Builder::new()
            .name(format!("{}-{}", self.inner.name, label))
            .spawn(move || f(flag))
            .map_err(|e| FlowError::Runtime(format!("failed to spawn helper thread: {}", e)))?;
        self.inner.handles.lock().push(handle);
        Ok(())
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::Acquire)
    }

    /// Raise the interrupt flag and join the threads that have exited.
    ///
    /// Returns the number of helpers joined. Helpers still running keep
    /// their handle and are joined by a later call.
    pub fn interrupt_all(&self) -> usize {
        self.inner.interrupted.store(true, Ordering::Release);

        let mut handles = self.inner.handles.lock();
        let mut joined = 0;
        let mut running = Vec::new();
        for handle in handles.drain(..) {
            if handle.is_finished() {
                if handle.join().is_err() {
                    tracing::warn!("[{}] helper thread panicked", self.inner.name);
                }
                joined += 1;
            } else {
                running.push(handle);
            }
        }
        *handles = running;

        tracing::debug!(
            "[{}] interrupted helpers ({} joined, {} still running)",
            self.inner.name,
            joined,
            handles.len()
        );
        joined
    }

    /// Clear the interrupt flag for the next run.
    pub fn reset(&self) {
        self.inner.interrupted.store(false, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.inner.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("name", &self.inner.name)
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_interrupt_stops_cooperative_helpers() {
        let group = ThreadGroup::new("tg");
        group
            .spawn("spin", |flag| {
                while !flag.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();
        assert_eq!(group.len(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut joined = group.interrupt_all();
        while joined == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
            joined += group.interrupt_all();
        }
        assert_eq!(joined, 1);
        assert!(group.is_empty());
        assert!(group.is_interrupted());

        group.reset();
        assert!(!group.is_interrupted());
    }
}
