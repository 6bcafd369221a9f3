// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod block;
pub mod blocks;
pub mod buffers;
pub mod config;
pub mod element;
pub mod error;
pub mod executor;
pub mod flow;
pub mod graph_file;
pub mod pool;
pub mod registry;
pub mod thread_group;
pub mod time;
pub mod token;
pub mod top_block;
pub mod topology;
pub mod worker;

pub use block::*;
pub use config::RuntimeConfig;
pub use element::*;
pub use error::*;
pub use executor::*;
pub use flow::Flow;
pub use graph_file::*;
pub use pool::{PoolCounters, ThreadPool};
pub use registry::{BlockConstructor, BlockRegistry};
pub use thread_group::ThreadGroup;
pub use time::{time_now, time_tps};
pub use token::{Token, TokenWatch};
pub use top_block::{QueryPath, QueryRequest, TopBlock};
pub use topology::*;
pub use worker::*;
