//! Agent entity and its update payload

use crate::{AgentId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent is active and may originate sales
    #[default]
    Active,
    /// Agent is retained for history but no longer active
    Inactive,
}

/// A node in the sales hierarchy.
///
/// `parent_id` is the only authoritative hierarchy link. `level` is an
/// informational tier and is never consulted when computing scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub level: i32,
    pub parent_id: Option<AgentId>,
    pub status: AgentStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Agent {
    /// Create a new active root agent.
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, level: i32) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            level,
            parent_id: None,
            status: AgentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the parent agent.
    pub fn with_parent(mut self, parent_id: impl Into<AgentId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

/// Update payload for the non-structural fields of an agent.
///
/// Re-parenting is deliberately absent; it goes through the directory's
/// `reparent` so the no-cycle check always runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentUpdate {
    /// New display name
    pub name: Option<String>,
    /// New informational level
    pub level: Option<i32>,
    /// New status
    pub status: Option<AgentStatus>,
}

impl AgentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.level.is_none() && self.status.is_none()
    }

    /// Apply this update in place, bumping `updated_at` when anything changed.
    pub fn apply_to(&self, agent: &mut Agent) {
        if let Some(name) = &self.name {
            agent.name = name.clone();
        }
        if let Some(level) = self.level {
            agent.level = level;
        }
        if let Some(status) = self.status {
            agent.status = status;
        }
        if !self.is_empty() {
            agent.updated_at = Utc::now();
        }
    }
}
