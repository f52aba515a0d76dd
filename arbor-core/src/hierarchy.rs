//! Nested hierarchy view types

use crate::{Agent, AgentId, AgentStatus};
use serde::{Deserialize, Serialize};

/// One node of the visualization tree, with its children nested inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: AgentId,
    pub name: String,
    pub level: i32,
    pub status: AgentStatus,
    pub parent_id: Option<AgentId>,
    pub children: Vec<HierarchyNode>,
}

/// Zero or more hierarchy trees.
pub type Forest = Vec<HierarchyNode>;

impl HierarchyNode {
    /// A childless node carrying the agent's display fields.
    pub fn leaf(agent: &Agent) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            level: agent.level,
            status: agent.status,
            parent_id: agent.parent_id.clone(),
            children: Vec::new(),
        }
    }

    /// Total nodes in this subtree, including this one.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Find a node by id anywhere in this subtree.
    pub fn find(&self, id: &AgentId) -> Option<&HierarchyNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if &node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}
