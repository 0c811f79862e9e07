//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the tree model depends on; implementations live
//! in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote hierarchical store (Box, or the in-memory store used in tests)
//! - [`ITreeObserver`] - Presentation layer notified after each tree operation
//! - [`IAuthenticator`] - Produces an access token from stored app credentials

pub mod auth;
pub mod presentation;
pub mod remote_store;

pub use auth::{IAuthenticator, Tokens};
pub use presentation::{ITreeObserver, IntentOutcome, TreeIntent, UploadOutcome};
pub use remote_store::{IRemoteStore, RemoteEntry, RemoteError, RemoteResult};
