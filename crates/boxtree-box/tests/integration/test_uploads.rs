//! Uploads and shared links

use boxtree_box::provider::BoxRemoteStore;
use boxtree_core::domain::{NodeKind, RemoteId};
use boxtree_core::ports::{IRemoteStore, RemoteError};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, item};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_upload_runs_preflight_then_multipart() {
    let (server, client) = common::setup_box_mock().await;
    Mock::given(method("OPTIONS"))
        .and(path("/files/content"))
        .and(body_json(json!({
            "name": "notes.txt",
            "parent": { "id": "0" },
            "size": 11
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "upload_url": "https://upload.box.com/api/2.0/files/content",
            "upload_token": "token"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/content"))
        .and(body_string_contains("name=\"attributes\""))
        .and(body_string_contains("hello world"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "total_count": 1,
            "entries": [item("file", "9001", "notes.txt")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let store = BoxRemoteStore::new(client);
    let dir = tempfile::tempdir().unwrap();
    let local = write_file(&dir, "notes.txt", "hello world");

    let entry = store.upload(&RemoteId::root(), &local).await.unwrap();

    assert_eq!(entry.id.as_str(), "9001");
    assert_eq!(entry.name, "notes.txt");
    assert_eq!(entry.kind, NodeKind::File);
}

#[tokio::test]
async fn test_preflight_conflict_skips_upload() {
    let (server, client) = common::setup_box_mock().await;
    Mock::given(method("OPTIONS"))
        .and(path("/files/content"))
        .respond_with(common::box_error(
            409,
            "item_name_in_use",
            Some(json!([{ "type": "file", "id": "777", "name": "notes.txt" }])),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/content"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let store = BoxRemoteStore::new(client);
    let dir = tempfile::tempdir().unwrap();
    let local = write_file(&dir, "notes.txt", "hello");

    let err = store.upload(&RemoteId::root(), &local).await.unwrap_err();

    assert_eq!(
        err,
        RemoteError::Conflict {
            conflicting_id: Some(RemoteId::new("777".to_string()).unwrap())
        }
    );
}

#[tokio::test]
async fn test_upload_missing_local_file() {
    let (_server, client) = common::setup_box_mock().await;
    let store = BoxRemoteStore::new(client);
    let dir = tempfile::tempdir().unwrap();

    let err = store
        .upload(&RemoteId::root(), &dir.path().join("absent.bin"))
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Unavailable(_)));
}

#[tokio::test]
async fn test_shared_link_prefers_download_url() {
    let (server, client) = common::setup_box_mock().await;
    Mock::given(method("PUT"))
        .and(path("/files/11"))
        .and(query_param("fields", "shared_link"))
        .and(body_json(json!({
            "shared_link": { "access": "open", "unshared_at": null }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "id": "11",
            "shared_link": {
                "url": "https://app.box.com/s/abc",
                "download_url": "https://app.box.com/shared/static/abc.txt",
                "access": "open"
            }
        })))
        .mount(&server)
        .await;
    let store = BoxRemoteStore::new(client);

    let url = store
        .get_download_link(&RemoteId::new("11".to_string()).unwrap())
        .await
        .unwrap();

    assert_eq!(url, "https://app.box.com/shared/static/abc.txt");
}

#[tokio::test]
async fn test_shared_link_without_download_url() {
    let (server, client) = common::setup_box_mock().await;
    Mock::given(method("PUT"))
        .and(path("/files/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "id": "12",
            "shared_link": { "url": "https://app.box.com/s/def", "download_url": null }
        })))
        .mount(&server)
        .await;
    let store = BoxRemoteStore::new(client);

    let url = store
        .get_download_link(&RemoteId::new("12".to_string()).unwrap())
        .await
        .unwrap();

    assert_eq!(url, "https://app.box.com/s/def");
}
