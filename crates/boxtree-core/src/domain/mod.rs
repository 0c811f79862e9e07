//! Domain entities and business logic
//!
//! This module contains the core domain types for boxtree:
//! - Newtypes for type-safe remote identifiers
//! - The local tree structure mirroring the remote hierarchy
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod tree_node;

// Re-export commonly used types
pub use errors::{DomainError, ErrorKind, SyncError};
pub use newtypes::RemoteId;
pub use tree_node::{NodeKind, NodeState, TreeNode};
