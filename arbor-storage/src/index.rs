//! Directory snapshots and the one-pass parent→children index.
//!
//! Anything that needs more than one subtree (the full hierarchy view, many
//! scope resolutions in one request) builds a [`HierarchyIndex`] once and
//! walks it in memory instead of issuing a directory query per node.

use arbor_core::{Agent, AgentId, ArborError, ArborResult};
use std::collections::HashMap;

/// Every agent in the directory, read atomically at one revision.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    /// Directory revision the snapshot was taken at
    pub revision: u64,
    /// All agents keyed by id
    pub agents: HashMap<AgentId, Agent>,
}

impl DirectorySnapshot {
    pub fn new(revision: u64, agents: impl IntoIterator<Item = Agent>) -> Self {
        Self {
            revision,
            agents: agents.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// In-memory parent→children index over a snapshot.
///
/// Children and roots are kept sorted by id so that anything assembled from
/// the index is deterministic.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    revision: u64,
    agents: HashMap<AgentId, Agent>,
    children: HashMap<AgentId, Vec<AgentId>>,
    roots: Vec<AgentId>,
    orphans: Vec<AgentId>,
}

impl HierarchyIndex {
    /// Build the index in a single pass over the snapshot.
    pub fn build(snapshot: DirectorySnapshot) -> Self {
        let DirectorySnapshot { revision, agents } = snapshot;
        let mut children: HashMap<AgentId, Vec<AgentId>> = HashMap::with_capacity(agents.len());
        let mut roots = Vec::new();
        let mut orphans = Vec::new();

        for agent in agents.values() {
            match &agent.parent_id {
                None => roots.push(agent.id.clone()),
                Some(parent) => {
                    if !agents.contains_key(parent) {
                        orphans.push(agent.id.clone());
                    }
                    children
                        .entry(parent.clone())
                        .or_default()
                        .push(agent.id.clone());
                }
            }
        }

        for ids in children.values_mut() {
            ids.sort();
        }
        roots.sort();
        orphans.sort();

        Self {
            revision,
            agents,
            children,
            roots,
            orphans,
        }
    }

    /// Build straight from a list of agents, e.g. rows loaded in bulk.
    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        Self::build(DirectorySnapshot::new(0, agents))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Agent by id, or `NotFound`.
    pub fn require(&self, id: &AgentId) -> ArborResult<&Agent> {
        self.agents.get(id).ok_or_else(|| ArborError::not_found(id))
    }

    /// Direct children of `id`, sorted. Empty for leaves and unknown ids.
    pub fn children(&self, id: &AgentId) -> &[AgentId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Agents with no parent, sorted.
    pub fn roots(&self) -> &[AgentId] {
        &self.roots
    }

    /// Agents whose parent id does not resolve, sorted.
    pub fn orphans(&self) -> &[AgentId] {
        &self.orphans
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, parent: Option<&str>) -> Agent {
        let a = Agent::new(id, id, 1);
        match parent {
            Some(p) => a.with_parent(p),
            None => a,
        }
    }

    #[test]
    fn test_build_indexes_children_and_roots() {
        let index = HierarchyIndex::from_agents(vec![
            agent("A", None),
            agent("C", Some("A")),
            agent("B", Some("A")),
            agent("D", None),
            agent("E", Some("D")),
        ]);

        assert_eq!(index.len(), 5);
        assert_eq!(index.roots(), &[AgentId::from("A"), AgentId::from("D")]);
        assert_eq!(
            index.children(&AgentId::from("A")),
            &[AgentId::from("B"), AgentId::from("C")]
        );
        assert!(index.children(&AgentId::from("E")).is_empty());
        assert!(index.orphans().is_empty());
    }

    #[test]
    fn test_build_records_orphans() {
        let index = HierarchyIndex::from_agents(vec![agent("A", None), agent("X", Some("ghost"))]);
        assert_eq!(index.orphans(), &[AgentId::from("X")]);
        assert_eq!(index.roots(), &[AgentId::from("A")]);
    }

    #[test]
    fn test_require_missing_is_not_found() {
        let index = HierarchyIndex::from_agents(vec![agent("A", None)]);
        assert!(index.require(&AgentId::from("A")).is_ok());
        assert!(index.require(&AgentId::from("B")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_snapshot() {
        let index = HierarchyIndex::build(DirectorySnapshot::default());
        assert!(index.is_empty());
        assert!(index.roots().is_empty());
    }

    #[test]
    fn test_revision_carried_from_snapshot() {
        let index = HierarchyIndex::build(DirectorySnapshot::new(7, vec![agent("A", None)]));
        assert_eq!(index.revision(), 7);
    }
}
