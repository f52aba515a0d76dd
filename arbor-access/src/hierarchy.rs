//! Nested hierarchy view for a principal.

use arbor_core::{
    AgentId, ArborResult, ConsistencyError, Forest, HierarchyNode, Principal,
};
use arbor_storage::HierarchyIndex;
use std::collections::{HashMap, HashSet};

/// Assembles [`Forest`]s from a prebuilt [`HierarchyIndex`].
///
/// All child lookups hit the in-memory index, never the directory.
#[derive(Debug)]
pub struct HierarchyBuilder<'a> {
    index: &'a HierarchyIndex,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(index: &'a HierarchyIndex) -> Self {
        Self { index }
    }

    /// Every root for admins, the bound subtree for bound principals, and
    /// nothing for unbound ones.
    pub fn build(&self, principal: &Principal) -> ArborResult<Forest> {
        match principal {
            Principal::Admin => self.build_all(),
            Principal::Bound(id) => {
                let mut visited = HashSet::new();
                Ok(vec![self.assemble(id, &mut visited)?])
            }
            Principal::Unbound => Ok(Vec::new()),
        }
    }

    fn build_all(&self) -> ArborResult<Forest> {
        let mut visited = HashSet::with_capacity(self.index.len());
        let forest = self
            .index
            .roots()
            .iter()
            .map(|root| self.assemble(root, &mut visited))
            .collect::<ArborResult<Forest>>()?;

        // Cycle members and orphans hang off no root.
        if visited.len() != self.index.len() {
            let mut unreachable: Vec<AgentId> = self
                .index
                .agents()
                .map(|a| a.id.clone())
                .filter(|id| !visited.contains(id))
                .collect();
            unreachable.sort();
            tracing::error!(
                count = unreachable.len(),
                orphans = self.index.orphans().len(),
                "agents unreachable from any root"
            );
            return Err(ConsistencyError::UnreachableNodes { ids: unreachable }.into());
        }
        Ok(forest)
    }

    /// Build the subtree under `root` without recursion: collect a preorder,
    /// then attach children bottom-up.
    fn assemble(
        &self,
        root: &AgentId,
        visited: &mut HashSet<AgentId>,
    ) -> ArborResult<HierarchyNode> {
        self.index.require(root)?;

        let mut order = Vec::new();
        let mut stack = vec![root.clone()];
        visited.insert(root.clone());
        while let Some(id) = stack.pop() {
            for child in self.index.children(&id) {
                if !visited.insert(child.clone()) {
                    tracing::error!(root = %root, repeated = %child, "cycle detected while building hierarchy");
                    return Err(ConsistencyError::CycleDetected {
                        root: root.clone(),
                        repeated: child.clone(),
                    }
                    .into());
                }
                stack.push(child.clone());
            }
            order.push(id);
        }

        let mut built: HashMap<AgentId, HierarchyNode> = HashMap::with_capacity(order.len());
        for id in order.iter().rev() {
            let mut node = HierarchyNode::leaf(self.index.require(id)?);
            node.children = self
                .index
                .children(id)
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(id.clone(), node);
        }

        built
            .remove(root)
            .ok_or_else(|| arbor_core::ArborError::not_found(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{Agent, ArborError};

    fn agent(id: &str, parent: Option<&str>) -> Agent {
        let a = Agent::new(id, format!("Agent {}", id), 1);
        match parent {
            Some(p) => a.with_parent(p),
            None => a,
        }
    }

    fn ids(forest: &[HierarchyNode]) -> Vec<&str> {
        forest.iter().map(|n| n.id.as_str()).collect()
    }

    fn scenario() -> HierarchyIndex {
        HierarchyIndex::from_agents(vec![
            agent("A", None),
            agent("B", Some("A")),
            agent("C", Some("B")),
            agent("C2", Some("B")),
            agent("D", None),
            agent("E", Some("D")),
        ])
    }

    #[test]
    fn test_admin_gets_every_root() {
        let index = scenario();
        let forest = HierarchyBuilder::new(&index).build(&Principal::Admin).unwrap();
        assert_eq!(ids(&forest), vec!["A", "D"]);
        assert_eq!(forest.iter().map(HierarchyNode::size).sum::<usize>(), 6);

        let b = &forest[0].children[0];
        assert_eq!(b.id, AgentId::from("B"));
        assert_eq!(ids(&b.children), vec!["C", "C2"]);
        assert_eq!(b.parent_id, Some(AgentId::from("A")));
    }

    #[test]
    fn test_bound_gets_own_subtree() {
        let index = scenario();
        let forest = HierarchyBuilder::new(&index)
            .build(&Principal::bound("B"))
            .unwrap();
        assert_eq!(ids(&forest), vec!["B"]);
        assert_eq!(forest[0].size(), 3);
        assert!(forest[0].find(&AgentId::from("A")).is_none());
    }

    #[test]
    fn test_unbound_gets_nothing() {
        let index = scenario();
        assert!(HierarchyBuilder::new(&index)
            .build(&Principal::Unbound)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_admin_empty_directory() {
        let index = HierarchyIndex::default();
        assert!(HierarchyBuilder::new(&index)
            .build(&Principal::Admin)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_bound_missing_is_not_found() {
        let index = scenario();
        let err = HierarchyBuilder::new(&index)
            .build(&Principal::bound("Z"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_admin_reports_cycle_members() {
        let index = HierarchyIndex::from_agents(vec![
            agent("R", None),
            agent("A", Some("C")),
            agent("B", Some("A")),
            agent("C", Some("B")),
        ]);
        let err = HierarchyBuilder::new(&index)
            .build(&Principal::Admin)
            .unwrap_err();
        match err {
            ArborError::Consistency(ConsistencyError::UnreachableNodes { ids }) => {
                assert_eq!(ids, vec![AgentId::from("A"), AgentId::from("B"), AgentId::from("C")]);
            }
            other => panic!("expected unreachable nodes, got {:?}", other),
        }
    }

    #[test]
    fn test_admin_reports_orphans() {
        let index = HierarchyIndex::from_agents(vec![agent("R", None), agent("X", Some("ghost"))]);
        let err = HierarchyBuilder::new(&index)
            .build(&Principal::Admin)
            .unwrap_err();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_bound_inside_cycle_is_consistency_error() {
        let index = HierarchyIndex::from_agents(vec![agent("A", Some("B")), agent("B", Some("A"))]);
        let err = HierarchyBuilder::new(&index)
            .build(&Principal::bound("A"))
            .unwrap_err();
        assert!(matches!(
            err,
            ArborError::Consistency(ConsistencyError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut agents = vec![agent("n0000", None)];
        for i in 1..1000 {
            agents.push(agent(&format!("n{:04}", i), Some(&format!("n{:04}", i - 1))));
        }
        let index = HierarchyIndex::from_agents(agents);
        let forest = HierarchyBuilder::new(&index).build(&Principal::Admin).unwrap();
        assert_eq!(forest[0].size(), 1000);
    }

    #[test]
    fn test_forest_serializes_nested() {
        let index = HierarchyIndex::from_agents(vec![agent("A", None), agent("B", Some("A"))]);
        let forest = HierarchyBuilder::new(&index).build(&Principal::Admin).unwrap();
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json[0]["id"], "A");
        assert_eq!(json[0]["children"][0]["id"], "B");
        assert_eq!(json[0]["children"][0]["parent_id"], "A");
        assert_eq!(json[0]["status"], "active");
    }
}
