//! Resolved access scopes

use crate::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of agents a principal may read or act upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "agent_ids", rename_all = "snake_case")]
pub enum ScopeResult {
    /// No restriction (admin)
    Unrestricted,
    /// Exactly these agents; includes the bound agent whenever one exists
    Bounded(BTreeSet<AgentId>),
}

impl ScopeResult {
    /// The empty scope of a principal with no binding.
    pub fn empty() -> Self {
        ScopeResult::Bounded(BTreeSet::new())
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, ScopeResult::Unrestricted)
    }

    /// Whether an agent falls inside this scope.
    pub fn contains(&self, id: &AgentId) -> bool {
        match self {
            ScopeResult::Unrestricted => true,
            ScopeResult::Bounded(ids) => ids.contains(id),
        }
    }

    /// Member ids of a bounded scope; `None` when unrestricted.
    pub fn agent_ids(&self) -> Option<&BTreeSet<AgentId>> {
        match self {
            ScopeResult::Unrestricted => None,
            ScopeResult::Bounded(ids) => Some(ids),
        }
    }

    /// Number of members of a bounded scope; `None` when unrestricted.
    pub fn len(&self) -> Option<usize> {
        self.agent_ids().map(BTreeSet::len)
    }

    /// True only for a bounded scope with no members.
    pub fn is_empty(&self) -> bool {
        matches!(self, ScopeResult::Bounded(ids) if ids.is_empty())
    }
}

impl FromIterator<AgentId> for ScopeResult {
    fn from_iter<I: IntoIterator<Item = AgentId>>(iter: I) -> Self {
        ScopeResult::Bounded(iter.into_iter().collect())
    }
}
