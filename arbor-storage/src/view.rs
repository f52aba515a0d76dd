//! Traversal views over agent hierarchies.
//!
//! Scope resolution walks downward and only needs child links; ancestry
//! checks walk upward and only need parent links plus the node count that
//! bounds the walk. Both are served either by per-node directory lookups
//! ([`DirectoryView`]) or by a prebuilt [`HierarchyIndex`].

use crate::{AgentDirectory, HierarchyIndex};
use arbor_core::{AgentId, ArborResult};

/// Downward traversal source.
pub trait ChildSource {
    /// Whether the agent exists.
    fn contains(&self, id: &AgentId) -> ArborResult<bool>;

    /// Ids of the direct children of `id`.
    fn child_ids(&self, id: &AgentId) -> ArborResult<Vec<AgentId>>;
}

/// Upward traversal source.
pub trait ParentSource {
    /// Parent of `id`; `NotFound` when `id` itself does not exist.
    fn parent_id(&self, id: &AgentId) -> ArborResult<Option<AgentId>>;

    /// Total number of agents, the upper bound on any ancestor chain.
    fn node_count(&self) -> ArborResult<usize>;
}

impl ChildSource for HierarchyIndex {
    fn contains(&self, id: &AgentId) -> ArborResult<bool> {
        Ok(self.get(id).is_some())
    }

    fn child_ids(&self, id: &AgentId) -> ArborResult<Vec<AgentId>> {
        Ok(self.children(id).to_vec())
    }
}

impl ParentSource for HierarchyIndex {
    fn parent_id(&self, id: &AgentId) -> ArborResult<Option<AgentId>> {
        Ok(self.require(id)?.parent_id.clone())
    }

    fn node_count(&self) -> ArborResult<usize> {
        Ok(self.len())
    }
}

/// Per-node lookups against a live directory.
#[derive(Debug)]
pub struct DirectoryView<'a, D: AgentDirectory + ?Sized> {
    directory: &'a D,
}

impl<'a, D: AgentDirectory + ?Sized> DirectoryView<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }
}

impl<D: AgentDirectory + ?Sized> ChildSource for DirectoryView<'_, D> {
    fn contains(&self, id: &AgentId) -> ArborResult<bool> {
        match self.directory.get_by_id(id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn child_ids(&self, id: &AgentId) -> ArborResult<Vec<AgentId>> {
        Ok(self
            .directory
            .children_of(id)?
            .into_iter()
            .map(|a| a.id)
            .collect())
    }
}

impl<D: AgentDirectory + ?Sized> ParentSource for DirectoryView<'_, D> {
    fn parent_id(&self, id: &AgentId) -> ArborResult<Option<AgentId>> {
        self.directory.get_by_id(id).map(|a| a.parent_id)
    }

    fn node_count(&self) -> ArborResult<usize> {
        self.directory.count()
    }
}
