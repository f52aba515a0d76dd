//! Arbor Test Utilities
//!
//! Shared test infrastructure for the Arbor workspace:
//! - Proptest generators for agent trees and principals
//! - Fixture directories, including deliberately corrupted ones
//! - A reference oracle for ancestor-chain membership
//! - Custom assertions over the error taxonomy

pub use arbor_core::{
    Agent, AgentId, AgentStatus, ArborError, ArborResult, Principal, ScopeResult,
};
pub use arbor_storage::{AgentDirectory, InMemoryDirectory};

use std::collections::HashMap;

/// Install a test-writer tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for agent trees and principals.

    use super::*;
    use proptest::prelude::*;

    /// Id of the `i`-th generated agent. Zero-padded so id order matches
    /// insertion order.
    pub fn node_id(i: usize) -> AgentId {
        AgentId::new(format!("n{:03}", i))
    }

    /// Generate a valid forest of 1..=`max` agents, listed parents first.
    ///
    /// Agent `i` either starts a new root or hangs under one of `0..i`.
    pub fn arb_forest(max: usize) -> impl Strategy<Value = Vec<Agent>> {
        prop::collection::vec(proptest::option::of(any::<prop::sample::Index>()), 1..=max.max(1))
            .prop_map(|choices| {
                choices
                    .iter()
                    .enumerate()
                    .map(|(i, choice)| {
                        let agent = Agent::new(node_id(i), format!("Agent {}", i), 1);
                        match choice {
                            Some(idx) if i > 0 => agent.with_parent(node_id(idx.index(i))),
                            _ => agent,
                        }
                    })
                    .collect()
            })
    }

    /// Generate a forest and then close one ancestor chain into a loop.
    ///
    /// Returns the agents and the id of an agent on the loop.
    pub fn arb_forest_with_cycle(max: usize) -> impl Strategy<Value = (Vec<Agent>, AgentId)> {
        (arb_forest(max), any::<prop::sample::Index>()).prop_map(|(mut agents, pick)| {
            let start = pick.index(agents.len());
            // Walk to the root of `start` and point that root back at `start`.
            let by_id: HashMap<AgentId, usize> = agents
                .iter()
                .enumerate()
                .map(|(i, a)| (a.id.clone(), i))
                .collect();
            let mut root = start;
            while let Some(parent) = &agents[root].parent_id {
                root = by_id[parent];
            }
            let looped = agents[start].id.clone();
            agents[root].parent_id = Some(looped.clone());
            (agents, looped)
        })
    }

    /// Generate a principal that may be bound to one of `ids`.
    pub fn arb_principal(ids: Vec<AgentId>) -> impl Strategy<Value = Principal> {
        let bound = if ids.is_empty() {
            Just(Principal::Unbound).boxed()
        } else {
            prop::sample::select(ids).prop_map(Principal::Bound).boxed()
        };
        prop_oneof![
            1 => Just(Principal::Admin),
            1 => Just(Principal::Unbound),
            4 => bound,
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built directories for common scenarios.

    use super::*;

    /// An active agent named after its id.
    pub fn agent(id: &str, parent: Option<&str>) -> Agent {
        let agent = Agent::new(id, format!("Agent {}", id), 1);
        match parent {
            Some(p) => agent.with_parent(p),
            None => agent,
        }
    }

    /// Agents from `(id, parent)` pairs, in order.
    pub fn agents_from_pairs(pairs: &[(&str, Option<&str>)]) -> Vec<Agent> {
        pairs.iter().map(|(id, parent)| agent(id, *parent)).collect()
    }

    /// A validated directory created through `create`, so pairs must list
    /// parents before children.
    pub fn directory_from_pairs(pairs: &[(&str, Option<&str>)]) -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        for a in agents_from_pairs(pairs) {
            if let Err(e) = directory.create(&a) {
                panic!("fixture agent {} rejected: {}", a.id, e);
            }
        }
        directory
    }

    /// A validated directory holding `agents`, listed parents first.
    pub fn directory_from_agents(agents: &[Agent]) -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        for a in agents {
            if let Err(e) = directory.create(a) {
                panic!("fixture agent {} rejected: {}", a.id, e);
            }
        }
        directory
    }

    /// A directory loaded without checks, for corrupted-data tests.
    pub fn corrupted_directory(pairs: &[(&str, Option<&str>)]) -> InMemoryDirectory {
        InMemoryDirectory::load_unchecked(agents_from_pairs(pairs))
    }

    /// `A(root) -> B -> C` and `D(root) -> E`.
    pub fn scenario_a() -> InMemoryDirectory {
        directory_from_pairs(&[
            ("A", None),
            ("B", Some("A")),
            ("C", Some("B")),
            ("D", None),
            ("E", Some("D")),
        ])
    }

    /// `A -> B -> C -> A` with `X` hanging under `C` and a healthy root `R`.
    pub fn cyclic_directory() -> InMemoryDirectory {
        corrupted_directory(&[
            ("R", None),
            ("A", Some("C")),
            ("B", Some("A")),
            ("C", Some("B")),
            ("X", Some("C")),
        ])
    }
}

// ============================================================================
// REFERENCE ORACLE
// ============================================================================

pub mod oracle {
    //! Brute-force answers to compare the engine against.

    use super::*;

    /// Whether walking `from`'s ancestor chain (inclusive) reaches `target`.
    ///
    /// Gives up after `agents.len()` hops, so loops answer `false`.
    pub fn chain_reaches(agents: &[Agent], from: &AgentId, target: &AgentId) -> bool {
        let parents: HashMap<&AgentId, Option<&AgentId>> = agents
            .iter()
            .map(|a| (&a.id, a.parent_id.as_ref()))
            .collect();
        let mut current = Some(from);
        for _ in 0..=agents.len() {
            match current {
                Some(id) if id == target => return true,
                Some(id) => current = parents.get(id).copied().flatten(),
                None => return false,
            }
        }
        false
    }

    /// Every agent whose chain reaches `root`.
    pub fn expected_scope(agents: &[Agent], root: &AgentId) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = agents
            .iter()
            .filter(|a| chain_reaches(agents, &a.id, root))
            .map(|a| a.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over results and scopes.

    use super::*;
    use arbor_core::{AccessError, ConflictError, ConsistencyError, StorageError};

    /// Assert that a result is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &ArborResult<T>) {
        match result {
            Err(ArborError::Storage(StorageError::NotFound { .. })) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a result is a Conflict error.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &ArborResult<T>) {
        match result {
            Err(ArborError::Conflict(_)) => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    /// Assert that a result is the delete-with-children conflict.
    #[track_caller]
    pub fn assert_has_children<T: std::fmt::Debug>(result: &ArborResult<T>) {
        match result {
            Err(ArborError::Conflict(ConflictError::HasChildren { .. })) => {}
            other => panic!("Expected HasChildren conflict, got: {:?}", other),
        }
    }

    /// Assert that a result is a data-consistency fault.
    #[track_caller]
    pub fn assert_consistency_error<T: std::fmt::Debug>(result: &ArborResult<T>) {
        match result {
            Err(ArborError::Consistency(_)) => {}
            other => panic!("Expected data consistency error, got: {:?}", other),
        }
    }

    /// Assert that a result reports a cycle found during downward traversal.
    #[track_caller]
    pub fn assert_cycle_detected<T: std::fmt::Debug>(result: &ArborResult<T>) {
        match result {
            Err(ArborError::Consistency(ConsistencyError::CycleDetected { .. })) => {}
            other => panic!("Expected CycleDetected, got: {:?}", other),
        }
    }

    /// Assert that a result is Forbidden.
    #[track_caller]
    pub fn assert_forbidden<T: std::fmt::Debug>(result: &ArborResult<T>) {
        match result {
            Err(ArborError::Access(AccessError::Forbidden { .. })) => {}
            other => panic!("Expected Forbidden, got: {:?}", other),
        }
    }

    /// Assert that a scope is bounded to exactly `expected`.
    #[track_caller]
    pub fn assert_bounded(scope: &ScopeResult, expected: &[&str]) {
        match scope.agent_ids() {
            Some(ids) => {
                let actual: Vec<&str> = ids.iter().map(AgentId::as_str).collect();
                let mut expected = expected.to_vec();
                expected.sort_unstable();
                assert_eq!(actual, expected, "bounded scope mismatch");
            }
            None => panic!("Expected bounded scope, got: {:?}", scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use super::oracle::*;
    use super::*;
    use proptest::prelude::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_scenario_a_shape() {
        let directory = scenario_a();
        assert_eq!(directory.count().unwrap(), 5);
        let roots: Vec<AgentId> = directory
            .list()
            .unwrap()
            .into_iter()
            .filter(Agent::is_root)
            .map(|a| a.id)
            .collect();
        assert_eq!(roots, vec![AgentId::from("A"), AgentId::from("D")]);
    }

    #[test]
    fn test_oracle_handles_loops() {
        let agents = agents_from_pairs(&[("A", Some("B")), ("B", Some("A")), ("C", None)]);
        assert!(chain_reaches(&agents, &AgentId::from("A"), &AgentId::from("B")));
        assert!(!chain_reaches(&agents, &AgentId::from("A"), &AgentId::from("C")));
    }

    #[test]
    fn test_expected_scope_is_sorted_closure() {
        let agents = agents_from_pairs(&[("A", None), ("C", Some("A")), ("B", Some("A")), ("D", None)]);
        let scope = expected_scope(&agents, &AgentId::from("A"));
        assert_eq!(scope, vec![AgentId::from("A"), AgentId::from("B"), AgentId::from("C")]);
    }

    #[test]
    fn test_generated_forest_loads_cleanly() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let agents = arb_forest(30).new_tree(&mut runner).unwrap().current();
            let directory = directory_from_agents(&agents);
            assert_eq!(directory.count().unwrap(), agents.len());
        }
    }

    #[test]
    fn test_generated_cycle_loops_back() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let (agents, looped) = arb_forest_with_cycle(30).new_tree(&mut runner).unwrap().current();
            let looped_agent = agents.iter().find(|a| a.id == looped).unwrap();
            let parent = looped_agent.parent_id.clone().unwrap();
            assert!(chain_reaches(&agents, &parent, &looped));
        }
    }
}
