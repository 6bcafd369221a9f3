// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// What a commit changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    /// Input table entries written in phase 1.
    pub inputs_added: usize,
    /// Output table entries written in phase 2.
    pub outputs_added: usize,
    /// Output table entries erased in phase 3.
    pub outputs_removed: usize,
    /// Input table entries erased in phase 4.
    pub inputs_removed: usize,
    /// Topology broadcasts issued, at most one per phase.
    pub broadcasts: usize,
    /// Workers in the committed graph.
    pub workers: usize,
}

impl CommitResult {
    pub fn has_changes(&self) -> bool {
        self.inputs_added > 0
            || self.outputs_added > 0
            || self.outputs_removed > 0
            || self.inputs_removed > 0
    }

    pub fn flows_added(&self) -> usize {
        self.inputs_added
    }

    pub fn flows_removed(&self) -> usize {
        self.inputs_removed
    }
}

impl fmt::Display for CommitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommitResult {{ +{} -{} flows, {} broadcasts, {} workers }}",
            self.inputs_added, self.inputs_removed, self.broadcasts, self.workers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_result_has_changes() {
        assert!(!CommitResult::default().has_changes());

        let removed = CommitResult {
            outputs_removed: 1,
            inputs_removed: 1,
            broadcasts: 2,
            ..Default::default()
        };
        assert!(removed.has_changes());
        assert_eq!(removed.flows_removed(), 1);
        assert_eq!(
            removed.to_string(),
            "CommitResult { +0 -1 flows, 2 broadcasts, 0 workers }"
        );
    }
}
