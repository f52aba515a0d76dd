//! Arbor Storage - Agent Directory Trait and In-Memory Implementation
//!
//! Defines the authoritative store of agent nodes. Implementations own
//! durable storage and guarantee id uniqueness and parent existence at write
//! time; the traversal engine only ever sees them through [`AgentDirectory`]
//! or a [`DirectorySnapshot`].

pub mod cache;
pub mod index;
pub mod view;

pub use cache::{CacheStats, ScopeCache};
pub use cache::scope_cache::ScopeMembers;
pub use index::{DirectorySnapshot, HierarchyIndex};
pub use view::{ChildSource, DirectoryView, ParentSource};

use arbor_core::{
    Agent, AgentId, AgentUpdate, ArborError, ArborResult, ConflictError, ConsistencyError,
    StorageError,
};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// DIRECTORY TRAIT
// ============================================================================

/// Authoritative store of agent nodes.
///
/// Every successful mutation increments [`AgentDirectory::revision`] by
/// exactly one; failed mutations leave it unchanged.
pub trait AgentDirectory: Send + Sync {
    // === Reads ===

    /// Get an agent by id, or `NotFound`.
    fn get_by_id(&self, id: &AgentId) -> ArborResult<Agent>;

    /// Direct children of an agent, ordered by id. `NotFound` if the agent
    /// itself does not exist.
    fn children_of(&self, id: &AgentId) -> ArborResult<Vec<Agent>>;

    /// Every agent, ordered by id.
    fn list(&self) -> ArborResult<Vec<Agent>>;

    /// Total number of agents.
    fn count(&self) -> ArborResult<usize>;

    /// Current mutation counter.
    fn revision(&self) -> ArborResult<u64>;

    /// All agents and the revision they were read at, taken atomically.
    fn snapshot(&self) -> ArborResult<DirectorySnapshot>;

    // === Mutations ===

    /// Insert a new agent. Conflict if the id exists or a non-null parent
    /// does not resolve.
    fn create(&self, agent: &Agent) -> ArborResult<()>;

    /// Update non-structural fields.
    fn update(&self, id: &AgentId, update: AgentUpdate) -> ArborResult<Agent>;

    /// Remove a leaf agent. Conflict while it has any direct child.
    fn delete(&self, id: &AgentId) -> ArborResult<Agent>;

    /// Move an agent under a new parent (or make it a root).
    ///
    /// Conflict if the new parent is the agent itself or lies within its
    /// descendant closure. Returns the previous parent.
    fn reparent(&self, id: &AgentId, new_parent_id: Option<&AgentId>)
        -> ArborResult<Option<AgentId>>;
}

// ============================================================================
// IN-MEMORY DIRECTORY
// ============================================================================

#[derive(Debug, Default)]
struct DirectoryState {
    agents: HashMap<AgentId, Agent>,
    /// parent id -> direct children; may hold keys for missing parents when
    /// loaded from corrupted data
    children: HashMap<AgentId, BTreeSet<AgentId>>,
    revision: u64,
}

impl DirectoryState {
    fn link(&mut self, parent: &AgentId, child: &AgentId) {
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
    }

    fn unlink(&mut self, parent: &AgentId, child: &AgentId) {
        if let Some(set) = self.children.get_mut(parent) {
            set.remove(child);
            if set.is_empty() {
                self.children.remove(parent);
            }
        }
    }

    fn child_count(&self, id: &AgentId) -> usize {
        self.children.get(id).map_or(0, BTreeSet::len)
    }

    /// Whether `target` appears on the ancestor chain starting at `start`
    /// (inclusive). Bounded by the agent count.
    fn chain_contains(&self, start: &AgentId, target: &AgentId) -> ArborResult<bool> {
        let limit = self.agents.len();
        let mut current = start.clone();
        let mut hops = 0usize;
        loop {
            if &current == target {
                return Ok(true);
            }
            hops += 1;
            if hops > limit {
                return Err(ConsistencyError::AncestorWalkExceeded {
                    start: start.clone(),
                    limit,
                }
                .into());
            }
            let agent = self
                .agents
                .get(&current)
                .ok_or_else(|| ArborError::not_found(&current))?;
            match &agent.parent_id {
                None => return Ok(false),
                Some(parent) if !self.agents.contains_key(parent) => {
                    return Err(ConsistencyError::DanglingParent {
                        id: current.clone(),
                        parent_id: parent.clone(),
                    }
                    .into())
                }
                Some(parent) => current = parent.clone(),
            }
        }
    }
}

/// In-memory agent directory.
///
/// A single lock guards the agent map, the parent→children index and the
/// revision so that snapshots are always internally consistent.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load persisted rows without invariant checks.
    ///
    /// Existing stores may already hold cycles or dangling parents; loading
    /// them as-is lets the engine report the fault instead of hiding it.
    /// Later rows with a duplicate id replace earlier ones.
    pub fn load_unchecked(agents: impl IntoIterator<Item = Agent>) -> Self {
        let mut state = DirectoryState::default();
        for agent in agents {
            let old_parent = state
                .agents
                .get(&agent.id)
                .and_then(|previous| previous.parent_id.clone());
            if let Some(old_parent) = old_parent {
                state.unlink(&old_parent, &agent.id);
            }
            if let Some(parent) = &agent.parent_id {
                state.link(parent, &agent.id);
            }
            state.agents.insert(agent.id.clone(), agent);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Remove all agents. Counts as one mutation.
    pub fn clear(&self) -> ArborResult<()> {
        let mut state = self.write()?;
        state.agents.clear();
        state.children.clear();
        state.revision += 1;
        Ok(())
    }

    fn read(&self) -> ArborResult<RwLockReadGuard<'_, DirectoryState>> {
        self.state
            .read()
            .map_err(|_| ArborError::from(StorageError::LockPoisoned))
    }

    fn write(&self) -> ArborResult<RwLockWriteGuard<'_, DirectoryState>> {
        self.state
            .write()
            .map_err(|_| ArborError::from(StorageError::LockPoisoned))
    }
}

impl AgentDirectory for InMemoryDirectory {
    fn get_by_id(&self, id: &AgentId) -> ArborResult<Agent> {
        let state = self.read()?;
        state
            .agents
            .get(id)
            .cloned()
            .ok_or_else(|| ArborError::not_found(id))
    }

    fn children_of(&self, id: &AgentId) -> ArborResult<Vec<Agent>> {
        let state = self.read()?;
        if !state.agents.contains_key(id) {
            return Err(ArborError::not_found(id));
        }
        Ok(state
            .children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| state.agents.get(child).cloned())
            .collect())
    }

    fn list(&self) -> ArborResult<Vec<Agent>> {
        let state = self.read()?;
        let mut agents: Vec<Agent> = state.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    fn count(&self) -> ArborResult<usize> {
        Ok(self.read()?.agents.len())
    }

    fn revision(&self) -> ArborResult<u64> {
        Ok(self.read()?.revision)
    }

    fn snapshot(&self) -> ArborResult<DirectorySnapshot> {
        let state = self.read()?;
        Ok(DirectorySnapshot {
            revision: state.revision,
            agents: state.agents.clone(),
        })
    }

    fn create(&self, agent: &Agent) -> ArborResult<()> {
        let mut state = self.write()?;
        if state.agents.contains_key(&agent.id) {
            return Err(ConflictError::DuplicateId {
                id: agent.id.clone(),
            }
            .into());
        }
        if let Some(parent) = &agent.parent_id {
            if parent == &agent.id {
                return Err(ConflictError::SelfParent {
                    id: agent.id.clone(),
                }
                .into());
            }
            if !state.agents.contains_key(parent) {
                return Err(ConflictError::UnknownParent {
                    id: agent.id.clone(),
                    parent_id: parent.clone(),
                }
                .into());
            }
            state.link(parent, &agent.id);
        }
        state.agents.insert(agent.id.clone(), agent.clone());
        state.revision += 1;
        tracing::debug!(agent_id = %agent.id, revision = state.revision, "agent created");
        Ok(())
    }

    fn update(&self, id: &AgentId, update: AgentUpdate) -> ArborResult<Agent> {
        let mut state = self.write()?;
        let agent = state
            .agents
            .get_mut(id)
            .ok_or_else(|| ArborError::not_found(id))?;
        update.apply_to(agent);
        let updated = agent.clone();
        state.revision += 1;
        tracing::debug!(agent_id = %id, revision = state.revision, "agent updated");
        Ok(updated)
    }

    fn delete(&self, id: &AgentId) -> ArborResult<Agent> {
        let mut state = self.write()?;
        if !state.agents.contains_key(id) {
            return Err(ArborError::not_found(id));
        }
        let child_count = state.child_count(id);
        if child_count > 0 {
            return Err(ConflictError::HasChildren {
                id: id.clone(),
                child_count,
            }
            .into());
        }
        let removed = state
            .agents
            .remove(id)
            .ok_or_else(|| ArborError::not_found(id))?;
        if let Some(parent) = &removed.parent_id {
            state.unlink(parent, id);
        }
        state.revision += 1;
        tracing::debug!(agent_id = %id, revision = state.revision, "agent deleted");
        Ok(removed)
    }

    fn reparent(
        &self,
        id: &AgentId,
        new_parent_id: Option<&AgentId>,
    ) -> ArborResult<Option<AgentId>> {
        let mut state = self.write()?;
        let old_parent = state
            .agents
            .get(id)
            .ok_or_else(|| ArborError::not_found(id))?
            .parent_id
            .clone();

        if let Some(new_parent) = new_parent_id {
            if new_parent == id {
                return Err(ConflictError::SelfParent { id: id.clone() }.into());
            }
            if !state.agents.contains_key(new_parent) {
                return Err(ConflictError::UnknownParent {
                    id: id.clone(),
                    parent_id: new_parent.clone(),
                }
                .into());
            }
            // The new parent lies in id's descendant closure exactly when id
            // lies on the new parent's ancestor chain.
            if state.chain_contains(new_parent, id)? {
                return Err(ConflictError::CycleIntroduced {
                    id: id.clone(),
                    new_parent_id: new_parent.clone(),
                }
                .into());
            }
        }

        if old_parent.as_ref() == new_parent_id {
            return Ok(old_parent);
        }

        if let Some(old) = &old_parent {
            state.unlink(old, id);
        }
        if let Some(new_parent) = new_parent_id {
            state.link(new_parent, id);
        }
        if let Some(agent) = state.agents.get_mut(id) {
            agent.parent_id = new_parent_id.cloned();
            agent.updated_at = Utc::now();
        }
        state.revision += 1;
        tracing::debug!(
            agent_id = %id,
            old_parent = ?old_parent,
            new_parent = ?new_parent_id,
            revision = state.revision,
            "agent reparented"
        );
        Ok(old_parent)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, parent: Option<&str>) -> Agent {
        let a = Agent::new(id, format!("Agent {}", id), 1);
        match parent {
            Some(p) => a.with_parent(p),
            None => a,
        }
    }

    /// A(root) -> B -> C, D(root) -> E
    fn scenario() -> InMemoryDirectory {
        let dir = InMemoryDirectory::new();
        for a in [
            agent("A", None),
            agent("B", Some("A")),
            agent("C", Some("B")),
            agent("D", None),
            agent("E", Some("D")),
        ] {
            dir.create(&a).unwrap();
        }
        dir
    }

    fn ids(agents: &[Agent]) -> Vec<&str> {
        agents.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_get_by_id() {
        let dir = scenario();
        assert_eq!(dir.get_by_id(&AgentId::from("B")).unwrap().name, "Agent B");
        assert!(dir.get_by_id(&AgentId::from("Z")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_children_of_direct_only() {
        let dir = scenario();
        assert_eq!(ids(&dir.children_of(&AgentId::from("A")).unwrap()), vec!["B"]);
        assert!(dir.children_of(&AgentId::from("C")).unwrap().is_empty());
        assert!(dir
            .children_of(&AgentId::from("Z"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_list_sorted() {
        let dir = scenario();
        assert_eq!(ids(&dir.list().unwrap()), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(dir.count().unwrap(), 5);
    }

    #[test]
    fn test_create_duplicate_conflicts() {
        let dir = scenario();
        let result = dir.create(&agent("B", None));
        assert!(matches!(
            result,
            Err(ArborError::Conflict(ConflictError::DuplicateId { .. }))
        ));
    }

    #[test]
    fn test_create_unknown_parent_conflicts() {
        let dir = scenario();
        let result = dir.create(&agent("X", Some("ghost")));
        assert!(matches!(
            result,
            Err(ArborError::Conflict(ConflictError::UnknownParent { .. }))
        ));
        assert_eq!(dir.count().unwrap(), 5);
    }

    #[test]
    fn test_create_self_parent_conflicts() {
        let dir = InMemoryDirectory::new();
        let result = dir.create(&agent("X", Some("X")));
        assert!(matches!(
            result,
            Err(ArborError::Conflict(ConflictError::SelfParent { .. }))
        ));
    }

    #[test]
    fn test_delete_with_children_conflicts() {
        let dir = scenario();
        let result = dir.delete(&AgentId::from("B"));
        assert!(matches!(
            result,
            Err(ArborError::Conflict(ConflictError::HasChildren { child_count: 1, .. }))
        ));
        assert!(dir.get_by_id(&AgentId::from("B")).is_ok());
    }

    #[test]
    fn test_delete_leaf_succeeds() {
        let dir = scenario();
        let removed = dir.delete(&AgentId::from("C")).unwrap();
        assert_eq!(removed.id, AgentId::from("C"));
        assert!(dir.children_of(&AgentId::from("B")).unwrap().is_empty());
        // B is a leaf now.
        assert!(dir.delete(&AgentId::from("B")).is_ok());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let dir = scenario();
        assert!(dir.delete(&AgentId::from("Z")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_changes_fields_not_parent() {
        let dir = scenario();
        let updated = dir
            .update(
                &AgentId::from("C"),
                AgentUpdate {
                    name: Some("Carol".to_string()),
                    level: Some(9),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Carol");
        assert_eq!(updated.level, 9);
        assert_eq!(updated.parent_id, Some(AgentId::from("B")));
        assert_eq!(dir.revision().unwrap(), 6);

        let missing = dir.update(&AgentId::from("ghost"), AgentUpdate::default());
        assert!(missing.unwrap_err().is_not_found());
        assert_eq!(dir.revision().unwrap(), 6);
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let dir = scenario();
        let old = dir
            .reparent(&AgentId::from("B"), Some(&AgentId::from("E")))
            .unwrap();
        assert_eq!(old, Some(AgentId::from("A")));
        assert!(dir.children_of(&AgentId::from("A")).unwrap().is_empty());
        assert_eq!(ids(&dir.children_of(&AgentId::from("E")).unwrap()), vec!["B"]);
    }

    #[test]
    fn test_reparent_to_root() {
        let dir = scenario();
        dir.reparent(&AgentId::from("C"), None).unwrap();
        assert!(dir.get_by_id(&AgentId::from("C")).unwrap().is_root());
        assert!(dir.children_of(&AgentId::from("B")).unwrap().is_empty());
    }

    #[test]
    fn test_reparent_under_self_conflicts() {
        let dir = scenario();
        let b = AgentId::from("B");
        assert!(matches!(
            dir.reparent(&b, Some(&b)),
            Err(ArborError::Conflict(ConflictError::SelfParent { .. }))
        ));
    }

    #[test]
    fn test_reparent_under_descendant_conflicts() {
        let dir = scenario();
        let result = dir.reparent(&AgentId::from("A"), Some(&AgentId::from("C")));
        assert!(matches!(
            result,
            Err(ArborError::Conflict(ConflictError::CycleIntroduced { .. }))
        ));
        assert!(dir.get_by_id(&AgentId::from("A")).unwrap().is_root());
    }

    #[test]
    fn test_reparent_unknown_parent_conflicts() {
        let dir = scenario();
        let result = dir.reparent(&AgentId::from("C"), Some(&AgentId::from("ghost")));
        assert!(matches!(
            result,
            Err(ArborError::Conflict(ConflictError::UnknownParent { .. }))
        ));
    }

    #[test]
    fn test_revision_counts_successful_mutations_only() {
        let dir = InMemoryDirectory::new();
        assert_eq!(dir.revision().unwrap(), 0);
        dir.create(&agent("A", None)).unwrap();
        dir.create(&agent("B", Some("A"))).unwrap();
        assert_eq!(dir.revision().unwrap(), 2);

        assert!(dir.create(&agent("B", None)).is_err());
        assert!(dir.delete(&AgentId::from("A")).is_err());
        assert_eq!(dir.revision().unwrap(), 2);

        // Same parent: no-op.
        dir.reparent(&AgentId::from("B"), Some(&AgentId::from("A")))
            .unwrap();
        assert_eq!(dir.revision().unwrap(), 2);

        dir.delete(&AgentId::from("B")).unwrap();
        assert_eq!(dir.revision().unwrap(), 3);
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let dir = scenario();
        let snapshot = dir.snapshot().unwrap();
        assert_eq!(snapshot.revision, 5);
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn test_load_unchecked_keeps_corruption() {
        // A -> B -> C -> A
        let dir = InMemoryDirectory::load_unchecked(vec![
            agent("A", Some("C")),
            agent("B", Some("A")),
            agent("C", Some("B")),
        ]);
        assert_eq!(dir.count().unwrap(), 3);
        assert_eq!(ids(&dir.children_of(&AgentId::from("C")).unwrap()), vec!["A"]);
    }

    #[test]
    fn test_reparent_on_corrupted_chain_reports_consistency() {
        let dir = InMemoryDirectory::load_unchecked(vec![
            agent("A", Some("C")),
            agent("B", Some("A")),
            agent("C", Some("B")),
            agent("X", None),
        ]);
        let result = dir.reparent(&AgentId::from("X"), Some(&AgentId::from("A")));
        assert!(matches!(
            result,
            Err(ArborError::Consistency(
                ConsistencyError::AncestorWalkExceeded { .. }
            ))
        ));
    }

    #[test]
    fn test_clear() {
        let dir = scenario();
        dir.clear().unwrap();
        assert_eq!(dir.count().unwrap(), 0);
        assert_eq!(dir.revision().unwrap(), 6);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
