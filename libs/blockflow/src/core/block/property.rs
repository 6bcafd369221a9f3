// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Typed block properties.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::error::{FlowError, Result};

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Bool,
    Int,
    UInt,
    Float,
    String,
}

impl PropertyType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value crossing the worker boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Bool(_) => PropertyType::Bool,
            Self::Int(_) => PropertyType::Int,
            Self::UInt(_) => PropertyType::UInt,
            Self::Float(_) => PropertyType::Float,
            Self::String(_) => PropertyType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Decode a document value against a declared type.
    ///
    /// Numbers, booleans and their string spellings are accepted; anything
    /// else fails with [`FlowError::TypeMismatch`].
    pub fn decode(key: &str, ty: PropertyType, value: &JsonValue) -> Result<Self> {
        let decoded = match (ty, value) {
            (PropertyType::Bool, JsonValue::Bool(v)) => Some(Self::Bool(*v)),
            (PropertyType::Bool, JsonValue::String(s)) => match s.trim() {
                "true" | "1" => Some(Self::Bool(true)),
                "false" | "0" => Some(Self::Bool(false)),
                _ => None,
            },
            (PropertyType::Int, JsonValue::Number(n)) => n.as_i64().map(Self::Int),
            (PropertyType::Int, JsonValue::String(s)) => s.trim().parse().ok().map(Self::Int),
            (PropertyType::UInt, JsonValue::Number(n)) => n.as_u64().map(Self::UInt),
            (PropertyType::UInt, JsonValue::String(s)) => s.trim().parse().ok().map(Self::UInt),
            (PropertyType::Float, JsonValue::Number(n)) => n.as_f64().map(Self::Float),
            (PropertyType::Float, JsonValue::String(s)) => s.trim().parse().ok().map(Self::Float),
            (PropertyType::String, JsonValue::String(s)) => Some(Self::String(s.clone())),
            (PropertyType::String, JsonValue::Number(n)) => Some(Self::String(n.to_string())),
            (PropertyType::String, JsonValue::Bool(b)) => Some(Self::String(b.to_string())),
            _ => None,
        };

        decoded.ok_or_else(|| FlowError::TypeMismatch {
            key: key.to_string(),
            expected: ty.name().to_string(),
            found: describe(value),
        })
    }
}

fn describe(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(_) => "bool".to_string(),
        JsonValue::Number(n) => format!("number {}", n),
        JsonValue::String(s) => format!("string {:?}", s),
        JsonValue::Array(_) => "array".to_string(),
        JsonValue::Object(_) => "object".to_string(),
    }
}

/// Declaration of one named property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub ty: PropertyType,
    pub readable: bool,
    pub writable: bool,
}

impl PropertySpec {
    pub fn read_write(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            readable: true,
            writable: true,
        }
    }

    pub fn read_only(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            readable: true,
            writable: false,
            ..Self::read_write(name, ty)
        }
    }

    pub fn write_only(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            readable: false,
            writable: true,
            ..Self::read_write(name, ty)
        }
    }
}

/// Named properties a block exposes, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    entries: BTreeMap<String, PropertySpec>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: impl IntoIterator<Item = PropertySpec>) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec);
        }
        registry
    }

    /// Add or replace a declaration.
    pub fn register(&mut self, spec: PropertySpec) {
        self.entries.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, key: &str) -> Option<&PropertySpec> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertySpec> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
