// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Monotonic tick clock shared by statistics and queries.

use std::sync::LazyLock;
use std::time::Instant;

static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Ticks elapsed since the process-wide epoch.
pub fn time_now() -> u64 {
    EPOCH.elapsed().as_nanos() as u64
}

/// Ticks per second of [`time_now`].
pub fn time_tps() -> u64 {
    1_000_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_is_monotonic() {
        let a = time_now();
        let b = time_now();
        assert!(b >= a);
        assert_eq!(time_tps(), 1_000_000_000);
    }
}
