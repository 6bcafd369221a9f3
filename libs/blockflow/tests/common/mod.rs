// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Blocks shared by the integration tests.

#![allow(dead_code)]

use blockflow::{Block, Element, IoSignature, Result, WorkIo};

/// A block that never produces, consumes or finishes on its own.
pub struct Idle(pub IoSignature);

impl Block for Idle {
    fn signature(&self) -> IoSignature {
        self.0
    }

    fn work(&mut self, _io: &mut WorkIo<'_>) -> Result<()> {
        Ok(())
    }
}

pub fn idle(name: &str, inputs: usize, outputs: usize) -> Element {
    Element::block(name, Idle(IoSignature::new(inputs, outputs)))
}

/// Route test logs through the test harness writer.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}
