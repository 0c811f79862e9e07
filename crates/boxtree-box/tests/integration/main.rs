//! Integration tests for boxtree-box
//!
//! Uses wiremock to simulate the Box API and verifies end-to-end behavior of
//! the BoxClient, the remote store adapter, uploads and authentication.

mod common;

mod test_store;
mod test_uploads;
