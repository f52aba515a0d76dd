//! Principals: the authenticated actor a request runs as

use crate::{AgentId, ArborResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role claim carried by a caller's identity.
///
/// Only `admin` is special. Every other role name is bounded to the caller's
/// agent binding and is kept verbatim for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unrestricted access regardless of any bound agent
    Admin,
    /// Any non-admin role; access bounded to the bound agent's subtree
    Other(String),
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = crate::ArborError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "role".to_string(),
            }
            .into());
        }
        if trimmed.eq_ignore_ascii_case("admin") {
            Ok(Role::Admin)
        } else {
            Ok(Role::Other(trimmed.to_string()))
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Other(name) => f.write_str(name),
        }
    }
}

/// The actor a request is evaluated for.
///
/// Built once per request from identity claims; every authorization decision
/// downstream matches on this variant instead of re-inspecting the role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "agent_id", rename_all = "snake_case")]
pub enum Principal {
    /// Sees and may act on everything
    Admin,
    /// Sees the bound agent and its transitive descendants
    Bound(AgentId),
    /// Non-admin caller with no agent binding; sees nothing
    Unbound,
}

impl Principal {
    /// Collapse a role and an optional binding into a principal.
    ///
    /// Admins ignore the binding. Non-admins without a binding become
    /// [`Principal::Unbound`], which is a valid state, not an error.
    pub fn from_claims(role: Role, bound_agent_id: Option<AgentId>) -> Self {
        match (role, bound_agent_id) {
            (Role::Admin, _) => Principal::Admin,
            (Role::Other(_), Some(id)) => Principal::Bound(id),
            (Role::Other(_), None) => Principal::Unbound,
        }
    }

    /// Parse raw claim strings as they arrive from the identity layer.
    ///
    /// A blank role claim is rejected; a blank binding counts as absent.
    pub fn from_raw_claims(role: &str, bound_agent_id: Option<&str>) -> ArborResult<Self> {
        let role: Role = role.parse()?;
        let bound = match bound_agent_id {
            Some(raw) if !raw.trim().is_empty() => Some(AgentId::parse(raw)?),
            _ => None,
        };
        Ok(Self::from_claims(role, bound))
    }

    pub fn bound(id: impl Into<AgentId>) -> Self {
        Principal::Bound(id.into())
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin)
    }

    /// The bound agent id, if any.
    pub fn bound_agent_id(&self) -> Option<&AgentId> {
        match self {
            Principal::Bound(id) => Some(id),
            _ => None,
        }
    }
}
