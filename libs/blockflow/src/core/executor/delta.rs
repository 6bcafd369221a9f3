// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Flow set difference between two resolves.

use std::collections::HashSet;

use crate::core::flow::Flow;

/// Flows to wire and unwire to move from the committed set to a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowDelta {
    /// In the new set but not the committed one, in new-set order.
    pub to_add: Vec<Flow>,
    /// In the committed set but not the new one, in committed order.
    pub to_remove: Vec<Flow>,
}

impl FlowDelta {
    pub fn compute(committed: &[Flow], resolved: &[Flow]) -> Self {
        let committed_set: HashSet<&Flow> = committed.iter().collect();
        let resolved_set: HashSet<&Flow> = resolved.iter().collect();

        let to_add = resolved
            .iter()
            .filter(|flow| !committed_set.contains(flow))
            .cloned()
            .collect();
        let to_remove = committed
            .iter()
            .filter(|flow| !resolved_set.contains(flow))
            .cloned()
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{Block, WorkIo};
    use crate::core::element::{Element, IoSignature};
    use crate::core::error::Result;

    struct Stub;

    impl Block for Stub {
        fn signature(&self) -> IoSignature {
            IoSignature::new(2, 2)
        }

        fn work(&mut self, _io: &mut WorkIo<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_empty_delta() {
        let delta = FlowDelta::default();
        assert!(delta.is_empty());
        assert_eq!(delta.change_count(), 0);
    }

    #[test]
    fn test_delta_is_a_set_difference() {
        let a = Element::block("a", Stub);
        let b = Element::block("b", Stub);
        let keep = Flow::between(&a, 0, &b, 0);
        let gone = Flow::between(&a, 1, &b, 1);
        let new = Flow::between(&b, 0, &a, 0);

        let delta = FlowDelta::compute(&[keep.clone(), gone.clone()], &[new.clone(), keep.clone()]);
        assert_eq!(delta.to_add, vec![new]);
        assert_eq!(delta.to_remove, vec![gone]);
        assert_eq!(delta.change_count(), 2);

        let same = FlowDelta::compute(&[keep.clone()], &[keep]);
        assert!(same.is_empty());
    }
}
