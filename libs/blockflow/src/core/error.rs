// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Query target not found: {0}")]
    QueryTarget(String),

    #[error("Type mismatch for property '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Graph file error: {0}")]
    GraphFile(String),

    #[error("Document codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
