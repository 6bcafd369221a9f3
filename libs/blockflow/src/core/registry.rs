// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Explicit registry of block constructors, keyed by kind name.
//!
//! Applications build one at start-up with ordinary calls; there is no
//! load-time registration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::block::Block;
use crate::core::blocks::{CopyBlock, HeadBlock, NullSink, NullSource};
use crate::core::element::{Element, ElementId};
use crate::core::error::{FlowError, Result};

/// Builds a block from its JSON configuration.
pub type BlockConstructor = Arc<dyn Fn(&Value) -> Result<Box<dyn Block>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct BlockRegistry {
    constructors: BTreeMap<String, BlockConstructor>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in utility blocks.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert_config("null_source", NullSource::new);
        registry.insert_config("null_sink", NullSink::new);
        registry.insert_config("head", HeadBlock::new);
        registry.insert_config("copy", CopyBlock::new);
        registry
    }

    fn insert_config<C, B, F>(&mut self, kind: &str, build: F)
    where
        C: DeserializeOwned + Default + 'static,
        B: Block,
        F: Fn(C) -> B + Send + Sync + 'static,
    {
        let constructor: BlockConstructor = Arc::new(move |config: &Value| {
            let config = parse_config::<C>(config)?;
            Ok(Box::new(build(config)) as Box<dyn Block>)
        });
        self.constructors.insert(kind.to_string(), constructor);
    }

    /// Register a constructor. Fails if `kind` is taken.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<Box<dyn Block>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.constructors.contains_key(&kind) {
            return Err(FlowError::Configuration(format!(
                "Block kind '{}' already registered",
                kind
            )));
        }
        tracing::debug!("Registered block kind '{}'", kind);
        self.constructors.insert(kind, Arc::new(constructor));
        Ok(())
    }

    pub fn unregister(&mut self, kind: &str) -> bool {
        self.constructors.remove(kind).is_some()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Construct a leaf element of `kind`.
    pub fn create(
        &self,
        kind: &str,
        id: impl Into<ElementId>,
        name: impl Into<String>,
        config: &Value,
    ) -> Result<Element> {
        let constructor = self.constructors.get(kind).ok_or_else(|| {
            FlowError::Configuration(format!("Unknown block kind '{}'", kind))
        })?;
        let block = constructor(config)?;
        Ok(Element::from_boxed(id, name, block))
    }
}

/// Decode a block configuration. `null` means all defaults.
fn parse_config<C: DeserializeOwned + Default>(config: &Value) -> Result<C> {
    if config.is_null() {
        return Ok(C::default());
    }
    serde_json::from_value(config.clone())
        .map_err(|e| FlowError::Configuration(format!("Invalid block config: {}", e)))
}

impl std::fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
