//! Handler-facing facade over a directory, the scope cache and the policy.

use crate::{AccessPolicy, HierarchyBuilder, QueryScoper, ScopeResolver};
use arbor_core::{
    AccessError, Agent, AgentId, AgentUpdate, ArborConfig, ArborResult, Forest,
    Principal, ScopeResult,
};
use arbor_storage::{
    AgentDirectory, CacheStats, DirectoryView, HierarchyIndex, ScopeCache, ScopeMembers,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Live-directory attempts before a closure read falls back to a snapshot.
const OPTIMISTIC_ATTEMPTS: usize = 3;

/// Scope resolution, access decisions and admin mutations for one directory.
///
/// Safe to share across threads; readers never block each other beyond the
/// directory's own locking.
#[derive(Debug)]
pub struct ScopeEngine<D: AgentDirectory> {
    directory: Arc<D>,
    cache: ScopeCache,
    config: ArborConfig,
}

impl<D: AgentDirectory> ScopeEngine<D> {
    /// Engine with the default configuration.
    pub fn new(directory: Arc<D>) -> Self {
        let config = ArborConfig::default();
        Self {
            directory,
            cache: ScopeCache::new(config.cache.clone()),
            config,
        }
    }

    /// Engine with a validated configuration.
    pub fn with_config(directory: Arc<D>, config: ArborConfig) -> ArborResult<Self> {
        config.validate()?;
        Ok(Self {
            directory,
            cache: ScopeCache::new(config.cache.clone()),
            config,
        })
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> ArborResult<CacheStats> {
        self.cache.stats()
    }

    // === Reads ===

    /// Agents whose data `principal` may read or act upon.
    pub fn resolve_scope(&self, principal: &Principal) -> ArborResult<ScopeResult> {
        AccessPolicy::compute_scope_with(principal, |root| {
            self.closure_of(root).map(Arc::unwrap_or_clone)
        })
    }

    /// Whether `principal` may touch `target`.
    ///
    /// A bound principal gets `NotFound` when either its binding or the
    /// target is unknown. The upward walk runs against the live directory
    /// and is retried, then evaluated on a snapshot, when a mutation lands
    /// mid-walk.
    pub fn can_access_agent(&self, principal: &Principal, target: &AgentId) -> ArborResult<bool> {
        let bound = match principal {
            Principal::Admin => return Ok(true),
            Principal::Unbound => return Ok(false),
            Principal::Bound(bound) => bound,
        };
        let view = DirectoryView::new(self.directory.as_ref());
        for attempt in 1..=OPTIMISTIC_ATTEMPTS {
            let before = self.directory.revision()?;
            let outcome = AccessPolicy::can_access_agent(&view, principal, target);
            if self.directory.revision()? == before {
                return outcome;
            }
            tracing::debug!(
                bound = %bound,
                target = %target,
                attempt,
                "directory changed during ancestry check, retrying"
            );
        }

        let index = HierarchyIndex::build(self.directory.snapshot()?);
        AccessPolicy::can_access_agent(&index, principal, target)
    }

    /// Like [`ScopeEngine::can_access_agent`], turning a denial into
    /// `Forbidden`.
    pub fn ensure_can_access(&self, principal: &Principal, target: &AgentId) -> ArborResult<()> {
        if self.can_access_agent(principal, target)? {
            return Ok(());
        }
        tracing::warn!(
            principal = ?principal,
            target = %target,
            "agent access denied"
        );
        Err(AccessError::Forbidden {
            target: target.clone(),
        }
        .into())
    }

    /// Ownership filter for `principal`'s scope.
    pub fn scope_filter(&self, principal: &Principal) -> ArborResult<QueryScoper> {
        self.resolve_scope(principal).map(QueryScoper::new)
    }

    /// Nested hierarchy visible to `principal`, from one directory snapshot.
    pub fn build_hierarchy(&self, principal: &Principal) -> ArborResult<Forest> {
        if let Principal::Unbound = principal {
            return Ok(Vec::new());
        }
        let index = HierarchyIndex::build(self.directory.snapshot()?);
        let forest = HierarchyBuilder::new(&index).build(principal)?;
        tracing::debug!(
            revision = index.revision(),
            trees = forest.len(),
            "hierarchy built"
        );
        Ok(forest)
    }

    /// Closures of several roots, all resolved against one snapshot.
    pub fn resolve_many(
        &self,
        roots: &[AgentId],
    ) -> ArborResult<Vec<(AgentId, BTreeSet<AgentId>)>> {
        let index = HierarchyIndex::build(self.directory.snapshot()?);
        ScopeResolver::new(&index).resolve_many(roots)
    }

    /// Descendant closure of `root`, served from the cache when it was
    /// computed at the current revision.
    fn closure_of(&self, root: &AgentId) -> ArborResult<ScopeMembers> {
        let view = DirectoryView::new(self.directory.as_ref());
        for attempt in 1..=OPTIMISTIC_ATTEMPTS {
            let before = self.directory.revision()?;
            if let Some(members) = self.cache.get(root, before)? {
                return Ok(members);
            }
            let outcome = ScopeResolver::new(&view).resolve(root);
            if self.directory.revision()? == before {
                let members = Arc::new(outcome?);
                self.cache.insert(root.clone(), Arc::clone(&members), before)?;
                return Ok(members);
            }
            tracing::debug!(root = %root, attempt, "directory changed during resolution, retrying");
        }

        let index = HierarchyIndex::build(self.directory.snapshot()?);
        let members: ScopeMembers = Arc::new(ScopeResolver::new(&index).resolve(root)?);
        self.cache
            .insert(root.clone(), Arc::clone(&members), index.revision())?;
        Ok(members)
    }

    // === Mutations ===

    /// Insert an agent under an existing parent, or as a new root.
    pub fn create_agent(&self, agent: &Agent) -> ArborResult<()> {
        self.directory.create(agent)?;
        let mut touched = vec![agent.id.clone()];
        touched.extend(agent.parent_id.iter().cloned());
        self.after_mutation(&touched)?;
        tracing::info!(agent_id = %agent.id, parent_id = ?agent.parent_id, "agent created");
        Ok(())
    }

    /// Change name, level or status. Topology is untouched.
    pub fn update_agent(&self, id: &AgentId, update: AgentUpdate) -> ArborResult<Agent> {
        let agent = self.directory.update(id, update)?;
        self.after_mutation(&[])?;
        tracing::info!(agent_id = %id, "agent updated");
        Ok(agent)
    }

    /// Remove a leaf agent.
    pub fn delete_agent(&self, id: &AgentId) -> ArborResult<Agent> {
        let removed = self.directory.delete(id)?;
        let mut touched = vec![id.clone()];
        touched.extend(removed.parent_id.iter().cloned());
        self.after_mutation(&touched)?;
        tracing::info!(agent_id = %id, "agent deleted");
        Ok(removed)
    }

    /// Move `id` under `new_parent_id`, or make it a root.
    pub fn reparent_agent(
        &self,
        id: &AgentId,
        new_parent_id: Option<&AgentId>,
    ) -> ArborResult<Option<AgentId>> {
        let old_parent = self.directory.reparent(id, new_parent_id)?;
        let touched: Vec<AgentId> = std::iter::once(id.clone())
            .chain(old_parent.iter().cloned())
            .chain(new_parent_id.cloned())
            .collect();
        self.after_mutation(&touched)?;
        tracing::info!(
            agent_id = %id,
            old_parent_id = ?old_parent,
            new_parent_id = ?new_parent_id,
            "agent reparented"
        );
        Ok(old_parent)
    }

    fn after_mutation(&self, touched: &[AgentId]) -> ArborResult<()> {
        let revision = self.directory.revision()?;
        self.cache.on_mutation(touched, revision)
    }
}
