//! Arbor Core - Entity Types
//!
//! Pure data structures shared by every Arbor crate: agent identity, the
//! principal a request runs as, resolved scopes, hierarchy views, the error
//! taxonomy and configuration. No traversal logic lives here.

pub mod agent;
pub mod config;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod identity;
pub mod principal;
pub mod scope;

pub use agent::{Agent, AgentStatus, AgentUpdate};
pub use config::{ArborConfig, CacheSettings, InvalidationStrategy};
pub use error::{
    AccessError, ArborError, ArborResult, ConfigError, ConflictError, ConsistencyError,
    ErrorCode, StorageError, ValidationError,
};
pub use filter::{FilterExpr, FilterOperator};
pub use hierarchy::{Forest, HierarchyNode};
pub use identity::{AgentId, Timestamp};
pub use principal::{Principal, Role};
pub use scope::ScopeResult;

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
