// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Dataflow execution engine for block graphs.
//!
//! A client declares a (possibly hierarchical) graph of blocks on a
//! [`TopBlock`], then drives it through `start`/`wait`/`stop`. Every commit
//! flattens the declared graph into point-to-point [`Flow`]s and applies only
//! the difference to the live workers.

#![allow(clippy::type_complexity)] // Complex types are clear in context

pub mod core;

pub use core::{
    time_now, time_tps, Block, BlockConstructor, BlockContext, BlockRegistry, BlockStats,
    CommitPhase, CommitResult, ConnectionTables, Element, ElementId, Executor, Flow, FlowDelta,
    FlowError, GraphFile, HierBlock, IoSignature, PoolCounters, Port, PortRef, PropertyRegistry,
    PropertySpec, PropertyType, PropertyValue, QueryPath, QueryRequest, Result, RuntimeConfig,
    ThreadGroup, ThreadPool, Token, TokenWatch, TopBlock, Topology, WorkIo, Worker, WorkerMessage,
    WorkerState,
};
