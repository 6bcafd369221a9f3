// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{Element, ElementId};

/// Connection point `(element, index)`.
///
/// Ports are coordinates, not allocations. Equality and hashing look at the
/// element id and the index only.
#[derive(Clone)]
pub struct Port {
    pub element: Element,
    pub index: usize,
}

impl Port {
    pub fn new(element: Element, index: usize) -> Self {
        Self { element, index }
    }

    pub fn id(&self) -> &ElementId {
        self.element.id()
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.element.id() == other.element.id()
    }
}

impl Eq for Port {}

impl Hash for Port {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.id().hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}):{}", self.element.name(), self.element.id(), self.index)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element.name(), self.index)
    }
}
