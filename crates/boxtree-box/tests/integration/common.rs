//! Shared test helpers for Box API integration tests
//!
//! Provides wiremock-based mock server setup for Box API endpoints. Each
//! helper mounts the endpoints a test needs; [`setup_box_mock`] returns a
//! client pointing at the mock server.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use boxtree_box::client::BoxClient;
use boxtree_box::rate_limit::RetryPolicy;

/// Starts a mock server with `GET /users/me` and returns a client for it
///
/// The client retries 429 twice with a 10 ms default wait.
pub async fn setup_box_mock() -> (MockServer, BoxClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "user",
            "id": "user-test-001",
            "name": "Service Account",
            "login": "AutomationUser_123@boxdevedition.com"
        })))
        .mount(&server)
        .await;

    let client = BoxClient::with_base_url("test-access-token", server.uri()).with_retry_policy(
        RetryPolicy {
            max_retries: 2,
            default_delay: Duration::from_millis(10),
        },
    );

    (server, client)
}

/// Mini representation of an item
pub fn item(kind: &str, id: &str, name: &str) -> Value {
    json!({ "type": kind, "id": id, "name": name })
}

/// A Box error response
pub fn box_error(status: u16, code: &str, conflicts: Option<Value>) -> ResponseTemplate {
    let mut body = json!({
        "type": "error",
        "status": status,
        "code": code,
        "message": format!("{code} reported by mock"),
        "request_id": "req-001"
    });
    if let Some(conflicts) = conflicts {
        body["context_info"] = json!({ "conflicts": conflicts });
    }
    ResponseTemplate::new(status).set_body_json(body)
}

/// Mounts `GET /folders/{id}`
pub async fn mount_folder(server: &MockServer, id: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/folders/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(item("folder", id, name)))
        .mount(server)
        .await;
}

/// Mounts one listing page of `GET /folders/{id}/items`
pub async fn mount_listing(
    server: &MockServer,
    folder_id: &str,
    offset: u64,
    limit: u32,
    total: u64,
    entries: Vec<Value>,
) {
    Mock::given(method("GET"))
        .and(path(format!("/folders/{folder_id}/items")))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", limit.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": total,
            "entries": entries,
            "offset": offset,
            "limit": limit,
            "order": [{ "by": "type", "direction": "ASC" }]
        })))
        .mount(server)
        .await;
}
