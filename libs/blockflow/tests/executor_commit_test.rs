// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Integration tests for incremental commits.
//!
//! Drives commits through a top block and checks the worker connection
//! tables against the resolved flows.

mod common;

use std::collections::HashSet;

use blockflow::{Element, ElementId, Flow, IoSignature, TopBlock};
use common::{idle, Idle};

/// (src id, src index, dst id, dst index) for every flow.
fn edges(flows: &[Flow]) -> HashSet<(ElementId, usize, ElementId, usize)> {
    flows
        .iter()
        .map(|f| (f.src.id().clone(), f.src.index, f.dst.id().clone(), f.dst.index))
        .collect()
}

/// Every flat flow has an entry on both sides, and nothing else does.
fn assert_tables_match(top: &TopBlock) {
    let expected = edges(&top.flat_flows());

    let mut from_outputs = HashSet::new();
    let mut from_inputs = HashSet::new();
    for worker in top.workers() {
        let tables = worker.tables();
        for (port, peers) in tables.outputs.iter().enumerate() {
            for peer in peers {
                from_outputs.insert((worker.id().clone(), port, peer.id.clone(), peer.index));
            }
        }
        for (port, peers) in tables.inputs.iter().enumerate() {
            for peer in peers {
                from_inputs.insert((peer.id.clone(), peer.index, worker.id().clone(), port));
            }
        }
    }

    assert_eq!(from_outputs, expected, "output tables diverge from flat flows");
    assert_eq!(from_inputs, expected, "input tables diverge from flat flows");
}

#[test]
fn test_first_commit_wires_every_flow() {
    common::init_logging();
    let top = TopBlock::new("chain");
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 1);
    let c = idle("c", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.connect(&b, 0, &c, 0);

    let result = top.commit().unwrap();
    assert_eq!(result.flows_added(), 2);
    assert_eq!(result.outputs_added, 2);
    assert_eq!(result.flows_removed(), 0);
    assert_eq!(result.workers, 3);
    assert_eq!(result.broadcasts, 2);

    let b_tables = b.worker().unwrap().tables();
    assert_eq!(b_tables.inputs[0].len(), 1);
    assert_eq!(b_tables.inputs[0][0].id, *a.id());
    assert_eq!(b_tables.outputs[0][0].id, *c.id());
    assert_tables_match(&top);
}

#[test]
fn test_commit_without_edits_is_a_no_op() {
    common::init_logging();
    let top = TopBlock::new("idempotent");
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 0);
    top.connect(&a, 0, &b, 0);

    assert!(top.commit().unwrap().has_changes());
    let before = b.worker().unwrap().tables();

    let second = top.commit().unwrap();
    assert!(!second.has_changes());
    assert_eq!(second.broadcasts, 0);
    assert_eq!(b.worker().unwrap().tables(), before);
}

#[test]
fn test_rewire_applies_only_the_difference() {
    common::init_logging();
    let top = TopBlock::new("rewire");
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 1);
    let c = idle("c", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.connect(&b, 0, &c, 0);
    top.commit().unwrap();

    assert!(top.disconnect(&b, 0, &c, 0));
    top.connect(&a, 0, &c, 0);
    let result = top.commit().unwrap();

    assert_eq!(result.flows_added(), 1);
    assert_eq!(result.flows_removed(), 1);
    assert_eq!(result.outputs_removed, 1);
    assert_eq!(result.broadcasts, 4);

    assert!(b.worker().unwrap().tables().outputs[0].is_empty());
    let c_inputs = c.worker().unwrap().tables().inputs;
    assert_eq!(c_inputs[0].len(), 1);
    assert_eq!(c_inputs[0][0].id, *a.id());
    assert_eq!(a.worker().unwrap().tables().outputs[0].len(), 2);
    assert_tables_match(&top);
}

#[test]
fn test_removed_worker_is_fully_unwired() {
    common::init_logging();
    let top = TopBlock::new("shrink");
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 0);
    let c = idle("c", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.connect(&a, 0, &c, 0);
    top.commit().unwrap();

    top.disconnect(&a, 0, &c, 0);
    let result = top.commit().unwrap();
    assert_eq!(result.workers, 2);
    assert!(c.worker().unwrap().tables().is_unwired());
    assert!(top.workers().iter().all(|w| w.id() != c.id()));
    assert_tables_match(&top);
}

#[test]
fn test_failed_commit_leaves_state_untouched() {
    common::init_logging();
    let top = TopBlock::new("strong");
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 0);
    let d = idle("d", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.commit().unwrap();
    let flat_before = edges(&top.flat_flows());
    let a_before = a.worker().unwrap().tables();

    // d has a single input, so index 3 cannot resolve.
    top.connect(&a, 0, &d, 3);
    assert!(top.commit().is_err());

    assert_eq!(edges(&top.flat_flows()), flat_before);
    assert_eq!(a.worker().unwrap().tables(), a_before);
    assert!(d.worker().unwrap().tables().is_unwired());

    top.disconnect(&a, 0, &d, 3);
    assert!(!top.commit().unwrap().has_changes());
}

#[test]
fn test_second_driver_is_rejected() {
    common::init_logging();
    let top = TopBlock::new("double-driven");
    let a = idle("a", 0, 1);
    let b = idle("b", 0, 1);
    let k = idle("k", 1, 0);
    top.connect(&a, 0, &k, 0);
    top.connect(&b, 0, &k, 0);

    let err = top.commit().unwrap_err();
    assert!(err.to_string().contains("driven by both"));
    assert!(top.workers().is_empty());
}

#[test]
fn test_blocks_sharing_an_id_are_rejected() {
    common::init_logging();
    let top = TopBlock::new("same-id");
    let first = Element::block_with_id("X", "first", Idle(IoSignature::source(1)));
    let second = Element::block_with_id("X", "second", Idle(IoSignature::source(1)));
    let s1 = idle("s1", 1, 0);
    let s2 = idle("s2", 1, 0);
    top.connect(&first, 0, &s1, 0);
    top.connect(&second, 0, &s2, 0);

    let err = top.commit().unwrap_err();
    assert!(err.to_string().contains("share id X"));
    assert!(top.workers().is_empty());
    assert!(second.worker().unwrap().tables().is_unwired());
    assert!(s2.worker().unwrap().tables().is_unwired());
}
