//! Storage-neutral filter expressions
//!
//! Downstream query builders (sales, transactions, agent listings) translate
//! a [`FilterExpr`] into their own query language. Keeping the expression
//! here means scope filtering is expressed once, not per handler.

use crate::AgentId;
use serde::{Deserialize, Serialize};

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// In list of values
    In,
}

/// A single field predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against (JSON value for flexibility)
    pub value: serde_json::Value,
}

impl FilterExpr {
    /// Create a new filter expression.
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a membership filter over agent ids.
    pub fn agent_in<'a>(
        field: impl Into<String>,
        ids: impl IntoIterator<Item = &'a AgentId>,
    ) -> Self {
        let values = ids
            .into_iter()
            .map(|id| serde_json::Value::String(id.as_str().to_string()))
            .collect();
        Self::new(field, FilterOperator::In, serde_json::Value::Array(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_in_builds_string_array() {
        let ids = [AgentId::from("B"), AgentId::from("C")];
        let expr = FilterExpr::agent_in("agent_id", ids.iter());
        assert_eq!(expr.operator, FilterOperator::In);
        assert_eq!(expr.value, serde_json::json!(["B", "C"]));
    }

    #[test]
    fn test_operator_serializes_lowercase() {
        let json = serde_json::to_value(FilterExpr::eq("status", serde_json::json!("active"))).unwrap();
        assert_eq!(json["operator"], "eq");
    }
}
