// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared completion marker.
//!
//! The controller keeps one handle and hands a clone to every worker it
//! activates. A worker drops its clone when it goes inert, so the run is
//! complete exactly when the controller's handle is the only one left.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct TokenState {
    owners: AtomicUsize,
    gate: Mutex<()>,
    released: Condvar,
}

/// Reference-counted completion token.
pub struct Token {
    state: Arc<TokenState>,
}

impl Token {
    /// A fresh token with a single owner.
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState {
                owners: AtomicUsize::new(1),
                gate: Mutex::new(()),
                released: Condvar::new(),
            }),
        }
    }

    /// Number of live handles to this token.
    pub fn owners(&self) -> usize {
        self.state.owners.load(Ordering::Acquire)
    }

    pub fn is_unique(&self) -> bool {
        self.owners() == 1
    }

    /// True when both handles refer to the same token.
    pub fn same_as(&self, other: &Token) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Block until this handle is the only owner or `deadline` passes.
    pub fn wait_unique(&self, deadline: Option<Instant>, poll: Duration) -> bool {
        self.watch().wait_unique(deadline, poll)
    }

    /// Observer of this token that does not count as an owner.
    pub fn watch(&self) -> TokenWatch {
        TokenWatch {
            state: Arc::clone(&self.state),
        }
    }
}

/// Non-owning view of a [`Token`] used to wait for completion.
pub struct TokenWatch {
    state: Arc<TokenState>,
}

impl TokenWatch {
    pub fn owners(&self) -> usize {
        self.state.owners.load(Ordering::Acquire)
    }

    /// True when this watch observes `token`.
    pub fn watches(&self, token: &Token) -> bool {
        Arc::ptr_eq(&self.state, &token.state)
    }

    /// True once at most one owner is left.
    pub fn is_settled(&self) -> bool {
        self.owners() <= 1
    }

    /// Block until at most one owner is left or `deadline` passes.
    ///
    /// Returns whether that was observed. The condition variable wakes the
    /// caller on every release; `poll` bounds each sleep so a missed
    /// wake-up costs at most one interval.
    pub fn wait_unique(&self, deadline: Option<Instant>, poll: Duration) -> bool {
        let poll = poll.max(Duration::from_micros(50));
        let mut guard = self.state.gate.lock();
        loop {
            if self.is_settled() {
                return true;
            }
            let sleep = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    poll.min(deadline - now)
                }
                None => poll,
            };
            self.state.released.wait_for(&mut guard, sleep);
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Token {
    fn clone(&self) -> Self {
        self.state.owners.fetch_add(1, Ordering::AcqRel);
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        let previous = self.state.owners.fetch_sub(1, Ordering::AcqRel);
        if previous <= 2 {
            // Taking the gate orders the notify after a waiter's uniqueness check.
            let _guard = self.state.gate.lock();
            self.state.released.notify_all();
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("owners", &self.owners()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clone_and_drop_track_owners() {
        let token = Token::new();
        assert!(token.is_unique());

        let a = token.clone();
        let b = a.clone();
        assert_eq!(token.owners(), 3);
        assert!(token.same_as(&b));

        drop(a);
        assert_eq!(token.owners(), 2);
        drop(b);
        assert!(token.is_unique());
    }

    #[test]
    fn test_fresh_tokens_are_distinct() {
        let first = Token::new();
        let stale = first.clone();
        let second = Token::new();

        assert!(!first.same_as(&second));
        assert!(second.is_unique());
        drop(stale);
    }

    #[test]
    fn test_wait_unique_wakes_on_release() {
        let token = Token::new();
        let held = token.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(held);
        });

        assert!(token.wait_unique(None, Duration::from_millis(1)));
        handle.join().unwrap();
    }

    #[test]
    fn test_watch_does_not_count_as_owner() {
        let token = Token::new();
        let watch = token.watch();
        assert_eq!(watch.owners(), 1);
        assert!(token.is_unique());

        let held = token.clone();
        assert!(!watch.is_settled());
        drop(token);
        assert!(watch.is_settled());
        drop(held);
        assert_eq!(watch.owners(), 0);
    }

    #[test]
    fn test_wait_unique_times_out() {
        let token = Token::new();
        let _held = token.clone();

        let start = Instant::now();
        let deadline = start + Duration::from_millis(30);
        assert!(!token.wait_unique(Some(deadline), Duration::from_millis(1)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
