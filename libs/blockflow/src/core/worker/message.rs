// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use bytes::Bytes;
use crossbeam_channel::Sender;

use super::stats::BlockStats;
use crate::core::block::PropertyValue;
use crate::core::element::ElementId;
use crate::core::error::Result;
use crate::core::pool::ThreadPool;
use crate::core::thread_group::ThreadGroup;
use crate::core::token::Token;

/// Execution resources broadcast before a run starts.
#[derive(Clone, Debug)]
pub struct WorkerResources {
    pub pool: ThreadPool,
    pub thread_group: ThreadGroup,
    pub default_buffer_size: usize,
    pub mailbox_batch: usize,
}

/// A property read (`value == None`) or write routed through the actor.
#[derive(Clone)]
pub struct PropAccess {
    pub key: String,
    pub value: Option<PropertyValue>,
    pub reply: Sender<Result<Option<PropertyValue>>>,
}

/// Everything a worker actor can be asked to do.
///
/// Runs are numbered by the controller. Data and completion notices carry
/// the sender's run so stragglers from an earlier run are discarded.
#[derive(Clone)]
pub enum WorkerMessage {
    /// Adopt the connection tables the executor already wrote.
    Topology,
    Resources(WorkerResources),
    Token { token: Token, run: u64 },
    /// Preferred output buffer size in bytes, 0 for the configured default.
    Hint(usize),
    /// Allocate output buffers for the coming run.
    Alloc,
    Active,
    Inert,
    Buffer { port: usize, data: Bytes, run: u64 },
    /// The producer feeding input `port` went inert.
    UpstreamDone { port: usize, run: u64 },
    /// The consumer `peer` fed by output `port` went inert.
    DownstreamDone {
        port: usize,
        peer: (ElementId, usize),
        run: u64,
    },
    Work,
    GetStats {
        reply: Sender<(ElementId, BlockStats)>,
    },
    PropAccess(PropAccess),
}

impl WorkerMessage {
    /// Query requests overtake queued data.
    pub fn is_priority(&self) -> bool {
        matches!(self, Self::GetStats { .. } | Self::PropAccess(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Topology => "topology",
            Self::Resources(_) => "resources",
            Self::Token { .. } => "token",
            Self::Hint(_) => "hint",
            Self::Alloc => "alloc",
            Self::Active => "active",
            Self::Inert => "inert",
            Self::Buffer { .. } => "buffer",
            Self::UpstreamDone { .. } => "upstream_done",
            Self::DownstreamDone { .. } => "downstream_done",
            Self::Work => "work",
            Self::GetStats { .. } => "get_stats",
            Self::PropAccess(_) => "prop_access",
        }
    }
}

impl fmt::Debug for WorkerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
