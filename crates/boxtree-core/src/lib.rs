//! boxtree Core - Domain logic for the remote tree model
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `TreeNode`, `NodeKind`, `NodeState`, `RemoteId`
//! - **Error taxonomy** - `SyncError` and its observer-facing `ErrorKind`
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `ITreeObserver`, `IAuthenticator`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module holds the local tree structure and never talks to the
//! network. Ports define the interfaces that adapter crates implement: the Box
//! HTTP adapter lives in `boxtree-box`, the synchronizer that drives the ports
//! lives in `boxtree-sync`.

pub mod config;
pub mod domain;
pub mod ports;
