//! Identity types for Arbor entities

use crate::{ArborResult, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Canonical external identifier of an agent.
///
/// This is the only identity space the engine scopes against. Storage
/// backends that keep their own internal keys must translate to this id
/// before calling into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Create an id from caller-supplied text.
    ///
    /// No validation is applied; use [`AgentId::parse`] at trust boundaries.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id, rejecting empty or whitespace-only input.
    pub fn parse(id: impl Into<String>) -> ArborResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "agent_id".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(Self(id))
    }

    /// Generate a fresh, timestamp-sortable id (UUIDv7 text).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
