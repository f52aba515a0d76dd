//! Principal → scope and direct-object decisions.
//!
//! The single policy family is "self and transitive descendants", with an
//! admin bypass. Every handler goes through here instead of branching on
//! roles itself.

use crate::{AncestryChecker, ScopeResolver};
use arbor_core::{AgentId, ArborResult, Principal, ScopeResult};
use arbor_storage::{ChildSource, ParentSource};
use std::collections::BTreeSet;

/// Stateless policy evaluation.
///
/// The `*_with` forms take the closure/ancestry computation as a function so
/// callers can put a cache in front of it; the plain forms evaluate directly
/// against a traversal source.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Scope of a principal, resolving bound closures with `resolve`.
    pub fn compute_scope_with<F>(principal: &Principal, resolve: F) -> ArborResult<ScopeResult>
    where
        F: FnOnce(&AgentId) -> ArborResult<BTreeSet<AgentId>>,
    {
        match principal {
            Principal::Admin => Ok(ScopeResult::Unrestricted),
            Principal::Bound(id) => Ok(ScopeResult::Bounded(resolve(id)?)),
            Principal::Unbound => Ok(ScopeResult::empty()),
        }
    }

    /// Direct-object decision, answering ancestry questions with `is_ancestor`
    /// (`candidate`, `start`).
    ///
    /// Descendants are reachable, ancestors and siblings never are.
    pub fn can_access_agent_with<F>(
        principal: &Principal,
        target: &AgentId,
        is_ancestor: F,
    ) -> ArborResult<bool>
    where
        F: FnOnce(&AgentId, &AgentId) -> ArborResult<bool>,
    {
        match principal {
            Principal::Admin => Ok(true),
            Principal::Bound(bound) if bound == target => Ok(true),
            Principal::Bound(bound) => is_ancestor(bound, target),
            Principal::Unbound => Ok(false),
        }
    }

    /// Scope of a principal evaluated against `source`.
    pub fn compute_scope<S: ChildSource + ?Sized>(
        source: &S,
        principal: &Principal,
    ) -> ArborResult<ScopeResult> {
        Self::compute_scope_with(principal, |root| ScopeResolver::new(source).resolve(root))
    }

    /// Direct-object decision evaluated against `source`.
    ///
    /// For bound principals both the binding and the target must exist,
    /// otherwise `NotFound`, matching what [`AccessPolicy::compute_scope`]
    /// reports for a missing binding.
    pub fn can_access_agent<S: ParentSource + ?Sized>(
        source: &S,
        principal: &Principal,
        target: &AgentId,
    ) -> ArborResult<bool> {
        if let Principal::Bound(bound) = principal {
            source.parent_id(bound)?;
            source.parent_id(target)?;
        }
        Self::can_access_agent_with(principal, target, |candidate, start| {
            AncestryChecker::new(source).is_ancestor(candidate, start)
        })
    }
}
