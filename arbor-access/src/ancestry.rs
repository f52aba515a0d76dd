//! Upward ancestor-chain membership for a single candidate.

use arbor_core::{AgentId, ArborResult, ConsistencyError};
use arbor_storage::ParentSource;

/// Answers "is X above Y?" by walking parent links, O(depth).
#[derive(Debug)]
pub struct AncestryChecker<'a, S: ParentSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ParentSource + ?Sized> AncestryChecker<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Whether `candidate` is a strict ancestor of `start`.
    ///
    /// `start` itself is never compared. The walk is bounded by the total
    /// agent count; exceeding it means the chain loops.
    pub fn is_ancestor(&self, candidate: &AgentId, start: &AgentId) -> ArborResult<bool> {
        let limit = self.source.node_count()?;
        let mut child = start.clone();
        let mut current = self.source.parent_id(start)?;
        let mut hops = 0usize;

        while let Some(parent) = current {
            if &parent == candidate {
                return Ok(true);
            }
            hops += 1;
            if hops > limit {
                tracing::error!(start = %start, limit, "ancestor walk exceeded agent count");
                return Err(ConsistencyError::AncestorWalkExceeded {
                    start: start.clone(),
                    limit,
                }
                .into());
            }
            current = match self.source.parent_id(&parent) {
                Ok(next) => next,
                Err(e) if e.is_not_found() => {
                    tracing::error!(agent = %child, parent = %parent, "dangling parent reference");
                    return Err(ConsistencyError::DanglingParent {
                        id: child,
                        parent_id: parent,
                    }
                    .into());
                }
                Err(e) => return Err(e),
            };
            child = parent;
        }

        Ok(false)
    }
}
