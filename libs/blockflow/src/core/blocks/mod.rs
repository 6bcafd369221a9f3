// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Utility blocks for wiring up and exercising graphs.

mod copy;
mod head;
mod null_sink;
mod null_source;

pub use copy::{CopyBlock, CopyConfig};
pub use head::{HeadBlock, HeadConfig};
pub use null_sink::{NullSink, NullSinkConfig};
pub use null_source::{NullSource, NullSourceConfig};
