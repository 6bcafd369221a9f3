// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Integration tests for building graphs from JSON files.

mod common;

use std::io::Write;

use blockflow::{BlockRegistry, FlowError, GraphFile, RuntimeConfig};
use serde_json::json;

const PIPELINE: &str = r#"{
    "name": "file-pipeline",
    "blocks": [
        { "id": "src", "kind": "null_source" },
        { "id": "head", "kind": "head", "config": { "num_items": 4096 } },
        { "id": "gate", "kind": "copy" },
        { "id": "sink", "kind": "null_sink", "name": "counter" }
    ],
    "connections": [
        { "from": "src:0", "to": "head:0" },
        { "from": "head:0", "to": "gate:0" },
        { "from": "gate:0", "to": "sink:0" }
    ]
}"#;

#[test]
fn test_graph_file_runs_to_completion() {
    common::init_logging();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PIPELINE.as_bytes()).unwrap();

    let graph = GraphFile::from_json_file(file.path()).unwrap();
    let config = RuntimeConfig {
        worker_threads: Some(2),
        ..Default::default()
    };
    let top = graph.build(&BlockRegistry::with_builtins(), config).unwrap();
    assert_eq!(top.name(), "file-pipeline");
    assert_eq!(top.pool().threads(), 2);

    top.run().unwrap();
    assert!(top.is_done());

    let items = top.query_value(&json!({
        "path": "/props.json",
        "block": "sink",
        "key": "items",
        "action": "get"
    }));
    assert_eq!(items["value"], 4096);

    let blocks = top.query_value(&json!({ "path": "/blocks.json" }));
    assert_eq!(blocks["blocks"]["sink"]["name"], "counter");
    assert_eq!(blocks["blocks"]["gate"]["name"], "gate");
}

#[test]
fn test_unknown_kind_fails_to_build() {
    common::init_logging();
    let graph = GraphFile::from_json_str(
        r#"{ "blocks": [ { "id": "x", "kind": "warp_drive" } ] }"#,
    )
    .unwrap();
    let err = graph
        .build(&BlockRegistry::with_builtins(), RuntimeConfig::default())
        .unwrap_err();
    assert!(matches!(err, FlowError::GraphFile(_)));
    assert!(err.to_string().contains("warp_drive"));
}

#[test]
fn test_bad_block_config_fails_to_build() {
    common::init_logging();
    let graph = GraphFile::from_json_str(
        r#"{ "blocks": [ { "id": "h", "kind": "head", "config": { "num_items": "many" } } ] }"#,
    )
    .unwrap();
    assert!(graph
        .build(&BlockRegistry::with_builtins(), RuntimeConfig::default())
        .is_err());
}

#[test]
fn test_missing_file_is_reported() {
    let err = GraphFile::from_json_file(std::path::Path::new("/nonexistent/graph.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/graph.json"));
}
