//! Downward closure: an agent and everything below it.

use arbor_core::{AgentId, ArborError, ArborResult, ConsistencyError};
use arbor_storage::ChildSource;
use std::collections::{BTreeSet, VecDeque};

/// Computes descendant closures over any [`ChildSource`].
///
/// Pass a [`arbor_storage::HierarchyIndex`] when resolving many roots in one
/// operation so the directory is read once, not once per node.
#[derive(Debug)]
pub struct ScopeResolver<'a, S: ChildSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ChildSource + ?Sized> ScopeResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// `root` plus every transitively reachable descendant.
    ///
    /// Breadth-first with a visited set. Reaching any agent twice means the
    /// child links loop, which fails the whole resolution.
    pub fn resolve(&self, root: &AgentId) -> ArborResult<BTreeSet<AgentId>> {
        if !self.source.contains(root)? {
            return Err(ArborError::not_found(root));
        }

        let mut visited = BTreeSet::new();
        visited.insert(root.clone());
        let mut frontier = VecDeque::from([root.clone()]);

        while let Some(id) = frontier.pop_front() {
            for child in self.source.child_ids(&id)? {
                if visited.contains(&child) {
                    tracing::error!(
                        root = %root,
                        repeated = %child,
                        parent = %id,
                        "cycle detected while resolving scope"
                    );
                    return Err(ConsistencyError::CycleDetected {
                        root: root.clone(),
                        repeated: child,
                    }
                    .into());
                }
                visited.insert(child.clone());
                frontier.push_back(child);
            }
        }

        tracing::debug!(root = %root, size = visited.len(), "scope resolved");
        Ok(visited)
    }

    /// Resolve several roots against the same source.
    pub fn resolve_many<'r>(
        &self,
        roots: impl IntoIterator<Item = &'r AgentId>,
    ) -> ArborResult<Vec<(AgentId, BTreeSet<AgentId>)>> {
        roots
            .into_iter()
            .map(|root| Ok((root.clone(), self.resolve(root)?)))
            .collect()
    }
}
