// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Output buffer allocation.
//!
//! Workers allocate their output buffers when the allocate broadcast
//! arrives. The default allocator records process-wide counters that the
//! stats query reports.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;

static BYTES_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static PEAK_BYTES_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);

/// Snapshot of the default allocator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorCounters {
    pub bytes_allocated: u64,
    pub peak_bytes_allocated: u64,
    pub allocation_count: u64,
}

pub fn allocator_counters() -> AllocatorCounters {
    AllocatorCounters {
        bytes_allocated: BYTES_ALLOCATED.load(Ordering::Relaxed),
        peak_bytes_allocated: PEAK_BYTES_ALLOCATED.load(Ordering::Relaxed),
        allocation_count: ALLOCATION_COUNT.load(Ordering::Relaxed),
    }
}

/// Allocate a zeroed buffer of `size` bytes through the default allocator.
pub fn allocate(size: usize) -> BytesMut {
    let size_u64 = size as u64;
    let total = BYTES_ALLOCATED.fetch_add(size_u64, Ordering::Relaxed) + size_u64;
    PEAK_BYTES_ALLOCATED.fetch_max(total, Ordering::Relaxed);
    ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
    BytesMut::zeroed(size)
}

/// Return `size` bytes previously obtained from [`allocate`].
pub fn release(size: usize) {
    let size_u64 = size as u64;
    let _ = BYTES_ALLOCATED.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(size_u64))
    });
}

/// Pick the output buffer size for one port.
///
/// A non-zero hint wins, otherwise the configured default applies.
pub fn buffer_size(hint: usize, default_size: usize) -> usize {
    if hint > 0 { hint } else { default_size }
}
