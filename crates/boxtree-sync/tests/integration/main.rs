//! Integration tests for boxtree-sync
//!
//! Drives the TreeSynchronizer against the in-memory remote store and checks
//! the tree against the store's contents and the calls it received.

mod common;

mod test_build;
mod test_mutations;
