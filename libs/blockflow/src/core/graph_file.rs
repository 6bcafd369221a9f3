// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Declarative graph file format.
//!
//! # Example Graph File
//!
//! ```json
//! {
//!   "name": "null-pipeline",
//!   "blocks": [
//!     { "id": "src", "kind": "null_source" },
//!     { "id": "head", "kind": "head", "config": { "num_items": 100000 } },
//!     { "id": "sink", "kind": "null_sink" }
//!   ],
//!   "connections": [
//!     { "from": "src:0", "to": "head:0" },
//!     { "from": "head:0", "to": "sink:0" }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::RuntimeConfig;
use crate::core::error::{FlowError, Result};
use crate::core::registry::BlockRegistry;
use crate::core::top_block::TopBlock;

/// Graph definition loaded from JSON.
///
/// Blocks are named by ids that are local to the file and become the
/// element ids of the built graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub name: Option<String>,

    pub blocks: Vec<BlockDefinition>,

    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: String,

    /// Registered kind name, e.g. `"head"`.
    pub kind: String,

    /// Display name. Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub config: serde_json::Value,
}

/// A connection using `"id:port"` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    pub from: String,
    pub to: String,
}

/// Parsed `"id:port"` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRef<'a> {
    pub id: &'a str,
    pub port: usize,
}

impl ConnectionDefinition {
    pub fn parse_from(&self) -> Result<EndpointRef<'_>> {
        parse_endpoint(&self.from)
    }

    pub fn parse_to(&self) -> Result<EndpointRef<'_>> {
        parse_endpoint(&self.to)
    }
}

fn parse_endpoint(s: &str) -> Result<EndpointRef<'_>> {
    let invalid = || {
        FlowError::GraphFile(format!(
            "Invalid endpoint '{}', expected 'id:port'",
            s
        ))
    };
    let (id, port) = s.rsplit_once(':').ok_or_else(invalid)?;
    if id.is_empty() {
        return Err(invalid());
    }
    let port = port.trim().parse().map_err(|_| invalid())?;
    Ok(EndpointRef { id, port })
}

impl GraphFile {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            FlowError::GraphFile(format!(
                "Failed to open graph file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_reader(file).map_err(|e| {
            FlowError::GraphFile(format!(
                "Failed to parse graph file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FlowError::GraphFile(format!("Failed to parse graph JSON: {}", e)))
    }

    /// Check ids are unique and connections name declared blocks.
    pub fn validate(&self) -> Result<()> {
        let mut ids: HashSet<&str> = HashSet::new();
        for block in &self.blocks {
            if !ids.insert(block.id.as_str()) {
                return Err(FlowError::GraphFile(format!(
                    "Duplicate block id: '{}'",
                    block.id
                )));
            }
        }

        for conn in &self.connections {
            for endpoint in [conn.parse_from()?, conn.parse_to()?] {
                if !ids.contains(endpoint.id) {
                    return Err(FlowError::GraphFile(format!(
                        "Connection references unknown block id: '{}'",
                        endpoint.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Instantiate every block through `registry` and declare the connections.
    pub fn build(&self, registry: &BlockRegistry, config: RuntimeConfig) -> Result<TopBlock> {
        self.validate()?;

        let name = self.name.clone().unwrap_or_else(|| "graph".to_string());
        let top = TopBlock::with_config(name, config)?;

        let mut elements = HashMap::new();
        for block in &self.blocks {
            let name = block.name.clone().unwrap_or_else(|| block.id.clone());
            let element = registry
                .create(&block.kind, block.id.as_str(), name, &block.config)
                .map_err(|e| FlowError::GraphFile(format!("Block '{}': {}", block.id, e)))?;
            elements.insert(block.id.as_str(), element);
        }

        for conn in &self.connections {
            let from = conn.parse_from()?;
            let to = conn.parse_to()?;
            let (Some(src), Some(dst)) = (elements.get(from.id), elements.get(to.id)) else {
                continue;
            };
            if !top.connect(src, from.port, dst, to.port) {
                tracing::warn!("Duplicate connection {} -> {} ignored", conn.from, conn.to);
            }
        }

        tracing::info!(
            "[{}] Loaded graph file: {} blocks, {} connections",
            top.id(),
            self.blocks.len(),
            self.connections.len()
        );
        Ok(top)
    }
}
