// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Integration tests for the JSON query interface.

mod common;

use blockflow::core::blocks::{HeadBlock, HeadConfig, NullSink, NullSinkConfig};
use blockflow::{Element, TopBlock};
use serde_json::{json, Value};

fn head_to_sink() -> (TopBlock, Element, Element) {
    let top = TopBlock::new("query");
    let head = Element::block_with_id("A", "head", HeadBlock::new(HeadConfig::default()));
    let sink = Element::block_with_id("B", "sink", NullSink::new(NullSinkConfig::default()));
    top.connect(&head, 0, &sink, 0);
    top.commit().unwrap();
    (top, head, sink)
}

fn object_keys(value: &Value) -> Vec<String> {
    let mut keys: Vec<String> = value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}

#[test]
fn test_blocks_lists_every_committed_block() {
    common::init_logging();
    let (top, _, _) = head_to_sink();
    let response = top.query_value(&json!({ "path": "/blocks.json" }));

    let blocks = &response["blocks"];
    assert_eq!(object_keys(blocks), ["A", "B"]);
    assert_eq!(blocks["A"]["name"], "head");
    assert_eq!(
        blocks["A"]["props"]["num_items"],
        json!({ "setter": "uint", "getter": "uint" })
    );
    assert_eq!(blocks["A"]["props"]["remaining"], json!({ "getter": "uint" }));
    assert_eq!(blocks["B"]["props"]["items"], json!({ "getter": "uint" }));
}

#[test]
fn test_stats_filter_and_counters() {
    common::init_logging();
    let (top, _, _) = head_to_sink();

    let filtered = top.query_value(&json!({ "path": "/stats.json", "blocks": ["A"] }));
    assert_eq!(object_keys(&filtered["blocks"]), ["A"]);
    assert!(filtered["tps"].as_u64().unwrap() > 0);
    assert!(filtered["now"].is_u64());
    assert!(filtered["framework_counter_messages_processed"].is_u64());
    assert!(filtered["blocks"]["A"]["init_time"].is_u64());
    assert_eq!(filtered["blocks"]["A"]["work_count"], 0);

    let all = top.query_value(&json!({ "path": "/stats.json" }));
    assert_eq!(object_keys(&all["blocks"]), ["A", "B"]);

    let missing = top.query_value(&json!({ "path": "/stats.json", "blocks": ["nope"] }));
    assert_eq!(missing["blocks"], json!({}));
}

#[test]
fn test_props_get_and_set() {
    common::init_logging();
    let (top, _, _) = head_to_sink();

    let get = |key: &str| {
        top.query_value(&json!({
            "path": "/props.json",
            "block": "A",
            "key": key,
            "action": "get"
        }))
    };

    assert_eq!(
        get("num_items"),
        json!({ "block": "A", "key": "num_items", "value": 1024 })
    );
    assert_eq!(get("no_such_key")["value"], Value::Null);

    let set = top.query_value(&json!({
        "path": "/props.json",
        "block": "A",
        "key": "num_items",
        "action": "set",
        "value": "250"
    }));
    assert_eq!(set, json!({}));
    assert_eq!(get("num_items")["value"], 250);

    // Not a number: the set is dropped and the old value stays.
    top.query_value(&json!({
        "path": "/props.json",
        "block": "A",
        "key": "num_items",
        "action": "set",
        "value": "lots"
    }));
    assert_eq!(get("num_items")["value"], 250);

    // Read-only properties cannot be set.
    top.query_value(&json!({
        "path": "/props.json",
        "block": "A",
        "key": "remaining",
        "action": "set",
        "value": 3
    }));
    assert_eq!(get("remaining")["value"], 1024);
}

#[test]
fn test_bad_requests_answer_empty() {
    common::init_logging();
    let (top, _, _) = head_to_sink();

    assert_eq!(top.query_value(&json!({ "path": "/nowhere.json" })), json!({}));
    assert_eq!(top.query_value(&json!({ "blocks": [] })), json!({}));
    assert_eq!(
        top.query_value(&json!({ "path": "/props.json", "block": "Z", "key": "x", "action": "get" })),
        json!({})
    );
    assert!(top.query("not json").is_err());
    assert_eq!(top.query(r#"{"path":"/nowhere.json"}"#).unwrap(), "{}");
}
