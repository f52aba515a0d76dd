//! Arbor Access - Hierarchical Scope Resolution
//!
//! Decides what a principal may see in a tree of agents:
//! - Descendant closures ([`ScopeResolver`])
//! - Upward ancestry checks ([`AncestryChecker`])
//! - The admin / bound / unbound policy ([`AccessPolicy`])
//! - Ownership filtering of downstream records ([`QueryScoper`])
//! - Nested hierarchy views ([`HierarchyBuilder`])
//!
//! Handlers normally go through [`ScopeEngine`], which adds the closure
//! cache and keeps it coherent across directory mutations.

pub mod ancestry;
pub mod engine;
pub mod hierarchy;
pub mod policy;
pub mod resolver;
pub mod scoper;

pub use ancestry::AncestryChecker;
pub use engine::ScopeEngine;
pub use hierarchy::HierarchyBuilder;
pub use policy::AccessPolicy;
pub use resolver::ScopeResolver;
pub use scoper::{AgentOwned, QueryScoper};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
