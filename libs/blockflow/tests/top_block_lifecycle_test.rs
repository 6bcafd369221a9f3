// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Integration tests for start/wait/stop and run completion.

mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use blockflow::core::blocks::{HeadBlock, HeadConfig, NullSink, NullSinkConfig, NullSource, NullSourceConfig};
use blockflow::{Element, TopBlock, WorkerState};
use common::idle;

fn head_pipeline(num_items: u64) -> (TopBlock, std::sync::Arc<std::sync::atomic::AtomicU64>) {
    let top = TopBlock::new("head-pipeline");
    let sink = NullSink::new(NullSinkConfig::default());
    let counter = sink.counter();

    let src = Element::block("src", NullSource::new(NullSourceConfig::default()));
    let head = Element::block(
        "head",
        HeadBlock::new(HeadConfig {
            num_items,
            ..Default::default()
        }),
    );
    let sink = Element::block("sink", sink);
    top.connect(&src, 0, &head, 0);
    top.connect(&head, 0, &sink, 0);
    (top, counter)
}

#[test]
fn test_fan_out_completes_after_last_sink() {
    common::init_logging();
    let top = TopBlock::new("fan-out");
    let source = idle("source", 0, 1);
    let sinks: Vec<Element> = (0..3).map(|i| idle(&format!("sink{}", i), 1, 0)).collect();
    for sink in &sinks {
        top.connect(&source, 0, sink, 0);
    }
    top.start().unwrap();
    assert!(!top.wait_timeout(0.05));

    let (last, rest) = sinks.split_last().unwrap();
    for sink in rest {
        sink.mark_done();
        assert!(!top.wait_timeout(0.05), "source finished before every sink was done");
    }

    last.mark_done();
    assert!(top.wait_timeout(5.0), "source never saw its last consumer finish");
    assert!(top.is_done());
    for worker in top.workers() {
        assert_eq!(worker.state(), WorkerState::Inert);
    }
}

#[test]
fn test_wait_timeout_honours_the_deadline() {
    common::init_logging();
    let top = TopBlock::new("idle");
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.start().unwrap();

    // One poll interval plus room for the scheduler to wake the thread.
    let slack = top.config().wait_poll_interval() + Duration::from_millis(50);
    let started = Instant::now();
    assert!(!top.wait_timeout(0.2));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "returned early after {:?}", elapsed);
    assert!(
        elapsed < Duration::from_millis(200) + slack,
        "overslept: {:?}",
        elapsed
    );

    top.stop();
    assert!(top.wait_timeout(5.0));
}

#[test]
fn test_stop_releases_wait() {
    common::init_logging();
    let top = std::sync::Arc::new(TopBlock::new("stopped"));
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 1);
    let c = idle("c", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.connect(&b, 0, &c, 0);
    top.start().unwrap();

    let waiter = {
        let top = std::sync::Arc::clone(&top);
        std::thread::spawn(move || top.wait())
    };
    std::thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());

    top.stop();
    waiter.join().unwrap();
    assert!(top.is_done());
}

#[test]
fn test_head_pipeline_delivers_exact_count() {
    common::init_logging();
    let (top, counter) = head_pipeline(100_000);
    top.run().unwrap();

    assert!(top.is_done());
    assert_eq!(counter.load(Ordering::Relaxed), 100_000);
}

#[test]
fn test_pipeline_can_run_again() {
    common::init_logging();
    let (top, counter) = head_pipeline(5_000);
    top.run().unwrap();
    assert_eq!(counter.load(Ordering::Relaxed), 5_000);

    top.run().unwrap();
    assert_eq!(counter.load(Ordering::Relaxed), 10_000);
}

#[test]
fn test_buffer_hint_bounds_output_buffers() {
    common::init_logging();
    let (top, counter) = head_pipeline(1_000);
    top.run_with_hint(64).unwrap();
    assert_eq!(counter.load(Ordering::Relaxed), 1_000);
}

#[test]
fn test_update_while_running_adds_a_consumer() {
    common::init_logging();
    let top = TopBlock::new("update");
    let source = idle("source", 0, 1);
    let first = idle("first", 1, 0);
    let second = idle("second", 1, 0);
    top.connect(&source, 0, &first, 0);
    top.start().unwrap();

    top.connect(&source, 0, &second, 0);
    top.update().unwrap();
    assert_eq!(top.workers().len(), 3);

    first.mark_done();
    assert!(!top.wait_timeout(0.05), "source ignored the consumer added by update");
    second.mark_done();
    assert!(top.wait_timeout(5.0));
}

#[test]
fn test_wait_survives_a_concurrent_update() {
    common::init_logging();
    let top = std::sync::Arc::new(TopBlock::new("restarted"));
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.start().unwrap();

    let waiter = {
        let top = std::sync::Arc::clone(&top);
        std::thread::spawn(move || top.wait_timeout(5.0))
    };
    std::thread::sleep(Duration::from_millis(100));
    top.update().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    assert!(
        !waiter.is_finished(),
        "wait returned while workers were still active"
    );
    for worker in top.workers() {
        assert_eq!(worker.state(), WorkerState::Active);
    }

    top.stop();
    assert!(waiter.join().unwrap());
    for worker in top.workers() {
        assert_eq!(worker.state(), WorkerState::Inert);
    }
}

#[test]
fn test_unbounded_timeout_waits_for_completion() {
    common::init_logging();
    let top = std::sync::Arc::new(TopBlock::new("infinite"));
    let a = idle("a", 0, 1);
    let b = idle("b", 1, 0);
    top.connect(&a, 0, &b, 0);
    top.start().unwrap();

    let stopper = {
        let top = std::sync::Arc::clone(&top);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            top.stop();
        })
    };
    let started = Instant::now();
    assert!(top.wait_timeout(f64::INFINITY));
    assert!(started.elapsed() >= Duration::from_millis(90));
    stopper.join().unwrap();
}
