//! TreeSynchronizer driving the Box adapter end to end

use std::sync::Arc;

use boxtree_box::provider::BoxRemoteStore;
use boxtree_core::config::SyncConfig;
use boxtree_core::domain::{ErrorKind, NodeKind, NodeState, RemoteId, SyncError};
use boxtree_sync::TreeSynchronizer;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, item};

#[tokio::test]
async fn test_load_root_pages_through_listing() {
    let (server, client) = common::setup_box_mock().await;
    common::mount_folder(&server, "0", "All Files").await;
    common::mount_listing(
        &server,
        "0",
        0,
        2,
        3,
        vec![item("folder", "10", "Docs"), item("file", "11", "a.txt")],
    )
    .await;
    common::mount_listing(&server, "0", 2, 2, 3, vec![item("file", "12", "b.txt")]).await;
    common::mount_listing(&server, "10", 0, 2, 0, vec![]).await;

    let store = Arc::new(BoxRemoteStore::new(client));
    let mut sync = TreeSynchronizer::new(
        store,
        SyncConfig {
            page_limit: 2,
            max_depth: None,
            ..SyncConfig::default()
        },
    );

    sync.load_root().await.unwrap();

    let names: Vec<&str> = sync.root().children().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Docs", "a.txt", "b.txt"]);
    let docs = sync.node(&RemoteId::new("10".to_string()).unwrap()).unwrap();
    assert_eq!(docs.state(), NodeState::Loaded);
    assert!(docs.children().is_empty());
}

#[tokio::test]
async fn test_create_folder_conflict_maps_to_name_conflict() {
    let (server, client) = common::setup_box_mock().await;
    common::mount_folder(&server, "0", "All Files").await;
    common::mount_listing(&server, "0", 0, 100, 1, vec![item("file", "11", "Docs")]).await;
    Mock::given(method("POST"))
        .and(path("/folders"))
        .respond_with(common::box_error(
            409,
            "item_name_in_use",
            Some(json!({ "type": "file", "id": "11", "name": "Docs" })),
        ))
        .mount(&server)
        .await;

    let store = Arc::new(BoxRemoteStore::new(client));
    let mut sync = TreeSynchronizer::new(
        store,
        SyncConfig {
            page_limit: 100,
            max_depth: None,
            ..SyncConfig::default()
        },
    );
    sync.load_root().await.unwrap();

    let err = sync
        .create_folder(&RemoteId::root(), "Docs")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SyncError::NameConflict {
            conflicting_id: Some(RemoteId::new("11".to_string()).unwrap())
        }
    );
    assert_eq!(sync.root().children().len(), 1);
}

#[tokio::test]
async fn test_web_link_has_no_download_link() {
    let (server, client) = common::setup_box_mock().await;
    common::mount_folder(&server, "0", "All Files").await;
    common::mount_listing(
        &server,
        "0",
        0,
        100,
        1,
        vec![item("web_link", "30", "Docs site")],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/files/30"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(BoxRemoteStore::new(client));
    let mut sync = TreeSynchronizer::new(
        store,
        SyncConfig {
            page_limit: 100,
            max_depth: None,
            ..SyncConfig::default()
        },
    );
    sync.load_root().await.unwrap();

    let link_id = RemoteId::new("30".to_string()).unwrap();
    let link = sync.node(&link_id).unwrap();
    assert_eq!(link.kind(), NodeKind::WebLink);
    assert_eq!(link.state(), NodeState::Loaded);

    let err = sync.get_download_link(&link_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}
