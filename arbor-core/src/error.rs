//! Error types for Arbor operations

use crate::AgentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Agent not found: {id}")]
    NotFound { id: AgentId },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Mutations rejected because they would break a directory invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Agent {id} already exists")]
    DuplicateId { id: AgentId },

    #[error("Parent {parent_id} of agent {id} does not exist")]
    UnknownParent { id: AgentId, parent_id: AgentId },

    #[error("Agent {id} still has {child_count} direct child(ren)")]
    HasChildren { id: AgentId, child_count: usize },

    #[error("Agent {id} cannot be its own parent")]
    SelfParent { id: AgentId },

    #[error("Moving agent {id} under {new_parent_id} would create a cycle")]
    CycleIntroduced { id: AgentId, new_parent_id: AgentId },
}

/// Stored hierarchy is corrupted. Never retried or tolerated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Cycle detected below {root}: agent {repeated} reached twice")]
    CycleDetected { root: AgentId, repeated: AgentId },

    #[error("Ancestor walk from {start} exceeded {limit} hops")]
    AncestorWalkExceeded { start: AgentId, limit: usize },

    #[error("Agent {id} references missing parent {parent_id}")]
    DanglingParent { id: AgentId, parent_id: AgentId },

    #[error("{} agent(s) unreachable from any root: {ids:?}", .ids.len())]
    UnreachableNodes { ids: Vec<AgentId> },
}

/// Access decisions surfaced to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Access to agent {target} is outside the caller's scope")]
    Forbidden { target: AgentId },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    ParseFailed { reason: String },
}

/// Master error type for all Arbor errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArborError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Data consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Arbor operations.
pub type ArborResult<T> = Result<T, ArborError>;

impl ArborError {
    /// Shorthand for a missing agent.
    pub fn not_found(id: &AgentId) -> Self {
        StorageError::NotFound { id: id.clone() }.into()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ArborError::Storage(StorageError::NotFound { .. }))
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, ArborError::Consistency(_))
    }

    /// Stable code handlers attach to client-facing responses.
    pub fn code(&self) -> ErrorCode {
        match self {
            ArborError::Storage(StorageError::NotFound { .. }) => ErrorCode::AgentNotFound,
            ArborError::Storage(StorageError::LockPoisoned) => ErrorCode::InternalError,
            ArborError::Conflict(ConflictError::DuplicateId { .. }) => {
                ErrorCode::AgentAlreadyExists
            }
            ArborError::Conflict(ConflictError::UnknownParent { .. }) => ErrorCode::ParentNotFound,
            ArborError::Conflict(ConflictError::HasChildren { .. }) => ErrorCode::AgentHasChildren,
            ArborError::Conflict(
                ConflictError::SelfParent { .. } | ConflictError::CycleIntroduced { .. },
            ) => ErrorCode::HierarchyCycle,
            ArborError::Consistency(_) => ErrorCode::DataConsistency,
            ArborError::Access(_) => ErrorCode::Forbidden,
            ArborError::Validation(_) => ErrorCode::ValidationFailed,
            ArborError::Config(_) => ErrorCode::InternalError,
        }
    }
}

/// Stable error codes for the request-handling layer.
///
/// Each code maps to an HTTP-class status so handlers translate errors
/// without re-deriving the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request validation failed
    ValidationFailed,
    /// Caller's scope excludes the target
    Forbidden,
    /// Referenced agent does not exist
    AgentNotFound,
    /// Agent with the same id already exists
    AgentAlreadyExists,
    /// Declared parent does not exist
    ParentNotFound,
    /// Delete blocked by existing children
    AgentHasChildren,
    /// Mutation would make the hierarchy cyclic
    HierarchyCycle,
    /// Stored hierarchy is corrupted
    DataConsistency,
    /// Internal failure
    InternalError,
}

impl ErrorCode {
    /// HTTP status code for this error code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ValidationFailed => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::AgentNotFound => 404,
            ErrorCode::AgentAlreadyExists
            | ErrorCode::ParentNotFound
            | ErrorCode::AgentHasChildren
            | ErrorCode::HierarchyCycle => 409,
            ErrorCode::DataConsistency | ErrorCode::InternalError => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

// =============================================================================
// TESTS
// =============================================================================
