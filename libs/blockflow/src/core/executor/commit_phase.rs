// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// Table mutation phase of a commit, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitPhase {
    /// Phase 1: wire new flows into destination input tables.
    AddInputs,
    /// Phase 2: wire new flows into source output tables.
    AddOutputs,
    /// Phase 3: unwire removed flows from source output tables.
    RemoveOutputs,
    /// Phase 4: unwire removed flows from destination input tables.
    RemoveInputs,
}

impl CommitPhase {
    pub const ALL: [CommitPhase; 4] = [
        CommitPhase::AddInputs,
        CommitPhase::AddOutputs,
        CommitPhase::RemoveOutputs,
        CommitPhase::RemoveInputs,
    ];

    pub fn next(self) -> Option<Self> {
        match self {
            Self::AddInputs => Some(Self::AddOutputs),
            Self::AddOutputs => Some(Self::RemoveOutputs),
            Self::RemoveOutputs => Some(Self::RemoveInputs),
            Self::RemoveInputs => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::AddInputs => 1,
            Self::AddOutputs => 2,
            Self::RemoveOutputs => 3,
            Self::RemoveInputs => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AddInputs => "ADD_INPUTS",
            Self::AddOutputs => "ADD_OUTPUTS",
            Self::RemoveOutputs => "REMOVE_OUTPUTS",
            Self::RemoveInputs => "REMOVE_INPUTS",
        }
    }

    /// True for the phases driven by added flows.
    pub fn is_addition(self) -> bool {
        matches!(self, Self::AddInputs | Self::AddOutputs)
    }
}

impl fmt::Display for CommitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}: {}", self.number(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering() {
        let mut phase = Some(CommitPhase::AddInputs);
        let mut walked = Vec::new();
        while let Some(p) = phase {
            walked.push(p);
            phase = p.next();
        }
        assert_eq!(walked, CommitPhase::ALL);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(CommitPhase::AddInputs.to_string(), "Phase 1: ADD_INPUTS");
        assert_eq!(CommitPhase::RemoveInputs.to_string(), "Phase 4: REMOVE_INPUTS");
        assert!(CommitPhase::AddOutputs.is_addition());
        assert!(!CommitPhase::RemoveOutputs.is_addition());
    }
}
