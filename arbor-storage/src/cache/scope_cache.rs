//! Revision-stamped cache of descendant closures keyed by root agent.

use super::stats::CacheStats;
use arbor_core::{AgentId, ArborResult, CacheSettings, InvalidationStrategy, StorageError};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Shared, immutable member set of a cached scope.
pub type ScopeMembers = Arc<BTreeSet<AgentId>>;

#[derive(Debug)]
struct CachedScope {
    members: ScopeMembers,
    /// Directory revision the closure was computed at
    revision: u64,
    /// Insertion order, used for eviction
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Latest directory revision this cache has observed
    watermark: u64,
    next_seq: u64,
    entries: HashMap<AgentId, CachedScope>,
}

/// Cache of `root -> descendant closure` results.
#[derive(Debug)]
pub struct ScopeCache {
    settings: CacheSettings,
    state: RwLock<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidated: AtomicU64,
    evictions: AtomicU64,
}

impl ScopeCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidated: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn strategy(&self) -> InvalidationStrategy {
        self.settings.strategy
    }

    /// Cached closure for `root`, if one was computed at `revision`.
    pub fn get(&self, root: &AgentId, revision: u64) -> ArborResult<Option<ScopeMembers>> {
        if !self.settings.enabled {
            return Ok(None);
        }
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        match state.entries.get(root) {
            Some(entry) if entry.revision == revision => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(root = %root, revision, "scope cache hit");
                Ok(Some(Arc::clone(&entry.members)))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(root = %root, revision, "scope cache miss");
                Ok(None)
            }
        }
    }

    /// Store a closure computed at `revision`.
    ///
    /// Returns `false` when the result is already outdated (a mutation was
    /// recorded after the computation's snapshot) and was discarded.
    pub fn insert(&self, root: AgentId, members: ScopeMembers, revision: u64) -> ArborResult<bool> {
        if !self.settings.enabled {
            return Ok(false);
        }
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        if revision < state.watermark {
            return Ok(false);
        }
        if revision > state.watermark {
            // Directory moved on without telling us what changed.
            self.drop_all(&mut state);
            state.watermark = revision;
        }

        if !state.entries.contains_key(&root) && state.entries.len() >= self.settings.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            root,
            CachedScope {
                members,
                revision,
                seq,
            },
        );
        Ok(true)
    }

    /// Record a mutation that produced `revision`, dropping affected entries
    /// according to the configured strategy.
    ///
    /// `touched` lists the agents whose membership in some closure may have
    /// changed: the mutated agent and its old and new parents.
    pub fn on_mutation(&self, touched: &[AgentId], revision: u64) -> ArborResult<()> {
        match self.settings.strategy {
            InvalidationStrategy::Wholesale => self.invalidate_all(revision),
            InvalidationStrategy::Targeted => self.invalidate_touching(touched, revision),
        }
    }

    /// Drop every entry.
    pub fn invalidate_all(&self, revision: u64) -> ArborResult<()> {
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        self.drop_all(&mut state);
        state.watermark = state.watermark.max(revision);
        Ok(())
    }

    /// Drop entries keyed by, or containing, any touched agent; survivors are
    /// carried forward to `revision`.
    ///
    /// Falls back to dropping everything unless `revision` directly follows
    /// the watermark, since an unseen intermediate mutation could have
    /// affected any entry.
    pub fn invalidate_touching(&self, touched: &[AgentId], revision: u64) -> ArborResult<()> {
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        if revision <= state.watermark {
            return Ok(());
        }
        if revision != state.watermark + 1 {
            self.drop_all(&mut state);
            state.watermark = revision;
            return Ok(());
        }

        let previous = state.watermark;
        let before = state.entries.len();
        state.entries.retain(|root, entry| {
            entry.revision == previous
                && !touched
                    .iter()
                    .any(|id| id == root || entry.members.contains(id))
        });
        for entry in state.entries.values_mut() {
            entry.revision = revision;
        }
        let dropped = (before - state.entries.len()) as u64;
        self.invalidated.fetch_add(dropped, Ordering::Relaxed);
        state.watermark = revision;
        tracing::debug!(revision, dropped, "scope cache targeted invalidation");
        Ok(())
    }

    pub fn len(&self) -> ArborResult<usize> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(state.entries.len())
    }

    pub fn is_empty(&self) -> ArborResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Counter snapshot. Fails only when the entry table's lock is poisoned.
    pub fn stats(&self) -> ArborResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.len()? as u64,
            invalidated: self.invalidated.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }

    fn drop_all(&self, state: &mut CacheState) {
        let dropped = state.entries.len() as u64;
        state.entries.clear();
        self.invalidated.fetch_add(dropped, Ordering::Relaxed);
        if dropped > 0 {
            tracing::debug!(dropped, "scope cache cleared");
        }
    }
}

impl Default for ScopeCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
