// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Runtime introspection over the committed workers.
//!
//! Requests and responses are JSON documents. Failures that concern one
//! block or property are logged and leave that part of the answer empty;
//! they never abort the whole query.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::block::PropertyValue;
use crate::core::buffers;
use crate::core::element::ElementId;
use crate::core::error::FlowError;
use crate::core::executor::Executor;
use crate::core::pool::ThreadPool;
use crate::core::time::{time_now, time_tps};
use crate::core::worker::{BlockStats, PropAccess, Worker, WorkerMessage};

/// Resource named by a request's `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPath {
    Blocks,
    Stats,
    Props,
}

impl QueryPath {
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            "/blocks.json" => Some(Self::Blocks),
            "/stats.json" => Some(Self::Stats),
            "/props.json" => Some(Self::Props),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "/blocks.json",
            Self::Stats => "/stats.json",
            Self::Props => "/props.json",
        }
    }
}

/// A decoded query document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub path: String,
    /// Block ids for `/stats.json`. Absent means every block.
    #[serde(default)]
    pub blocks: Option<Vec<String>>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    /// `get` or `set`.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl QueryRequest {
    pub fn from_value(value: &Value) -> Result<Self, FlowError> {
        Ok(Self::deserialize(value)?)
    }
}

pub(crate) fn execute(executor: &Executor, pool: &ThreadPool, request: &QueryRequest) -> Value {
    match QueryPath::parse(&request.path) {
        Some(QueryPath::Blocks) => query_blocks(executor),
        Some(QueryPath::Stats) => query_stats(executor, pool, request),
        Some(QueryPath::Props) => query_props(executor, request),
        None => {
            tracing::warn!("Unknown query path '{}'", request.path);
            empty()
        }
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}

fn query_blocks(executor: &Executor) -> Value {
    let mut blocks = Map::new();
    for worker in executor.workers() {
        let mut props = Map::new();
        for spec in worker.properties().iter() {
            let mut attrs = Map::new();
            if spec.writable {
                attrs.insert("setter".into(), json!(spec.ty.name()));
            }
            if spec.readable {
                attrs.insert("getter".into(), json!(spec.ty.name()));
            }
            props.insert(spec.name.clone(), Value::Object(attrs));
        }
        blocks.insert(
            worker.id().to_string(),
            json!({ "name": worker.name(), "props": props }),
        );
    }
    json!({ "blocks": blocks })
}

fn query_stats(executor: &Executor, pool: &ThreadPool, request: &QueryRequest) -> Value {
    let allocator = buffers::allocator_counters();
    let counters = pool.counters();
    let mut root = Map::new();
    root.insert("now".into(), json!(time_now()));
    root.insert("tps".into(), json!(time_tps()));
    root.insert(
        "default_allocator_bytes_allocated".into(),
        json!(allocator.bytes_allocated),
    );
    root.insert(
        "default_allocator_peak_bytes_allocated".into(),
        json!(allocator.peak_bytes_allocated),
    );
    root.insert(
        "default_allocator_allocation_count".into(),
        json!(allocator.allocation_count),
    );
    root.insert(
        "framework_counter_messages_processed".into(),
        json!(counters.messages_processed),
    );
    root.insert("framework_counter_yields".into(), json!(counters.yields));
    root.insert(
        "framework_counter_shared_pushes".into(),
        json!(counters.shared_pushes),
    );
    root.insert(
        "framework_counter_mailbox_queue_max".into(),
        json!(counters.mailbox_queue_max),
    );

    let targets: Vec<&Arc<Worker>> = executor
        .workers()
        .iter()
        .filter(|worker| match &request.blocks {
            Some(ids) => ids.iter().any(|id| worker.id() == id.as_str()),
            None => true,
        })
        .collect();
    if let Some(ids) = &request.blocks {
        for id in ids {
            if executor.find_worker(id).is_none() {
                tracing::warn!("{}", FlowError::QueryTarget(format!("block '{}'", id)));
            }
        }
    }

    let (reply, replies) = crossbeam_channel::unbounded::<(ElementId, BlockStats)>();
    for worker in &targets {
        worker.post(WorkerMessage::GetStats {
            reply: reply.clone(),
        });
    }
    drop(reply);

    let mut outstanding = targets.len();
    let mut collected: HashMap<ElementId, BlockStats> = HashMap::with_capacity(outstanding);
    while outstanding > 0 {
        match replies.recv() {
            Ok((id, stats)) => {
                collected.insert(id, stats);
                outstanding -= 1;
            }
            Err(_) => {
                tracing::warn!("{} stats replies never arrived", outstanding);
                break;
            }
        }
    }

    let mut blocks = Map::new();
    for worker in targets {
        if let Some(stats) = collected.remove(worker.id()) {
            match serde_json::to_value(&stats) {
                Ok(value) => {
                    blocks.insert(worker.id().to_string(), value);
                }
                Err(e) => tracing::warn!("[{}] stats encoding failed: {}", worker.id(), e),
            }
        }
    }
    root.insert("blocks".into(), Value::Object(blocks));
    Value::Object(root)
}

fn query_props(executor: &Executor, request: &QueryRequest) -> Value {
    let (Some(block_id), Some(key)) = (&request.block, &request.key) else {
        tracing::warn!("Props query needs 'block' and 'key'");
        return empty();
    };
    let Some(worker) = executor.find_worker(block_id) else {
        tracing::warn!("{}", FlowError::QueryTarget(format!("block '{}'", block_id)));
        return empty();
    };

    match request.action.as_deref() {
        Some("get") => {
            let value = get_property(worker, key).unwrap_or(Value::Null);
            json!({ "block": block_id, "key": key, "value": value })
        }
        Some("set") => {
            if let Err(e) = set_property(worker, key, request.value.as_ref()) {
                tracing::warn!("[{}] property set dropped: {}", worker.id(), e);
            }
            empty()
        }
        other => {
            tracing::warn!("Unknown props action {:?}", other);
            empty()
        }
    }
}

fn dispatch(worker: &Worker, key: &str, value: Option<PropertyValue>) -> Result<Option<PropertyValue>, FlowError> {
    let (reply, response) = crossbeam_channel::bounded(1);
    worker.post(WorkerMessage::PropAccess(PropAccess {
        key: key.to_string(),
        value,
        reply,
    }));
    response
        .recv()
        .map_err(|_| FlowError::Runtime(format!("[{}] dropped property request", worker.id())))?
}

fn get_property(worker: &Worker, key: &str) -> Option<Value> {
    let Some(spec) = worker.properties().get(key) else {
        tracing::debug!("[{}] {}", worker.id(), FlowError::QueryTarget(format!("property '{}'", key)));
        return None;
    };
    if !spec.readable {
        tracing::warn!("[{}] property '{}' is write-only", worker.id(), key);
        return None;
    }
    match dispatch(worker, key, None) {
        Ok(value) => value.map(|v| v.to_json()),
        Err(e) => {
            tracing::warn!("[{}] property get failed: {}", worker.id(), e);
            None
        }
    }
}

fn set_property(worker: &Worker, key: &str, value: Option<&Value>) -> Result<(), FlowError> {
    let spec = worker
        .properties()
        .get(key)
        .filter(|spec| spec.writable)
        .ok_or_else(|| FlowError::QueryTarget(format!("writable property '{}'", key)))?;
    let value = value.ok_or_else(|| FlowError::TypeMismatch {
        key: key.to_string(),
        expected: spec.ty.name().to_string(),
        found: "nothing".to_string(),
    })?;
    let decoded = PropertyValue::decode(key, spec.ty, value)?;
    dispatch(worker, key, Some(decoded))?;
    Ok(())
}
