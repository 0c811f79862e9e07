//! BoxTree Sync - keeps a local folder tree consistent with the remote store
//!
//! Provides:
//! - Paginated, depth-limited subtree builds with lazy expansion
//! - Atomic folder refresh (build off-tree, swap in one step)
//! - Rename, delete, create-folder and batch upload with confirmed local updates
//! - Observer notification for every operation
//!
//! ## Modules
//!
//! - [`synchronizer`] - The [`TreeSynchronizer`] that owns the tree
//! - [`memory`] - Deterministic in-memory remote store

pub mod memory;
pub mod synchronizer;

pub use memory::InMemoryRemoteStore;
pub use synchronizer::TreeSynchronizer;
