//! Process-wide cache of resolved descendant closures.
//!
//! Readers never block each other; the hierarchy is logically immutable
//! between mutations. Every entry is stamped with the directory revision it
//! was computed at and is served only while that revision is current, so a
//! mutation that bypasses the engine can never surface a stale scope.

pub mod scope_cache;
pub mod stats;

pub use scope_cache::ScopeCache;
pub use stats::CacheStats;
