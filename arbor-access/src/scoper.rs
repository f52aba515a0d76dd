//! Ownership filtering for agent-keyed records.

use arbor_core::{Agent, AgentId, FilterExpr, ScopeResult};

/// A record owned by exactly one agent (a sale, a transaction, an agent row).
pub trait AgentOwned {
    fn owner_agent_id(&self) -> &AgentId;
}

impl AgentOwned for Agent {
    fn owner_agent_id(&self) -> &AgentId {
        &self.id
    }
}

impl<T: AgentOwned + ?Sized> AgentOwned for &T {
    fn owner_agent_id(&self) -> &AgentId {
        (**self).owner_agent_id()
    }
}

/// Predicate derived from a resolved scope.
///
/// Unrestricted scopes pass everything through; bounded scopes keep records
/// whose owner is a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryScoper {
    scope: ScopeResult,
}

impl QueryScoper {
    /// Field name used by [`QueryScoper::to_filter_expr`] unless overridden.
    pub const DEFAULT_OWNER_FIELD: &'static str = "agent_id";

    pub fn new(scope: ScopeResult) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &ScopeResult {
        &self.scope
    }

    pub fn is_pass_through(&self) -> bool {
        self.scope.is_unrestricted()
    }

    pub fn matches(&self, owner: &AgentId) -> bool {
        self.scope.contains(owner)
    }

    pub fn permits<T: AgentOwned + ?Sized>(&self, record: &T) -> bool {
        self.matches(record.owner_agent_id())
    }

    /// Keep only permitted records, preserving order.
    pub fn apply<T: AgentOwned>(&self, records: impl IntoIterator<Item = T>) -> Vec<T> {
        records.into_iter().filter(|r| self.permits(r)).collect()
    }

    /// Storage-neutral form for query builders: `None` means no filter,
    /// a single member becomes `field = id`, otherwise `field IN (members)`.
    pub fn to_filter_expr(&self, field: &str) -> Option<FilterExpr> {
        let ids = self.scope.agent_ids()?;
        let mut members = ids.iter();
        match (members.next(), members.next()) {
            (Some(only), None) => Some(FilterExpr::eq(
                field,
                serde_json::Value::String(only.as_str().to_string()),
            )),
            _ => Some(FilterExpr::agent_in(field, ids.iter())),
        }
    }
}

impl From<ScopeResult> for QueryScoper {
    fn from(scope: ScopeResult) -> Self {
        Self::new(scope)
    }
}
