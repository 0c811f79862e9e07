//! Rename, delete, create-folder and upload

use std::path::PathBuf;

use boxtree_core::domain::{ErrorKind, NodeState, RemoteId, SyncError};
use boxtree_core::ports::{RemoteError, UploadOutcome};
use boxtree_sync::memory::{StoreCall, StoreOp};

use crate::common::{self, child_set, store_child_set};

#[tokio::test]
async fn test_root_cannot_be_renamed_or_deleted() {
    let (store, observer, mut sync) = common::setup(100);
    common::seed_tree(&store);
    sync.load_root().await.unwrap();
    store.clear_calls();
    let root = RemoteId::root();

    assert_eq!(
        sync.rename(&root, "Everything").await.unwrap_err(),
        SyncError::ProtectedNode
    );
    assert_eq!(sync.delete_node(&root).await.unwrap_err(), SyncError::ProtectedNode);

    assert_eq!(store.call_count(), 0);
    assert_eq!(sync.root().name(), "All Files");
    assert_eq!(
        *observer.errors.lock().unwrap(),
        vec![
            (root.clone(), ErrorKind::ProtectedNode),
            (root, ErrorKind::ProtectedNode)
        ]
    );
}

#[tokio::test]
async fn test_delete_non_empty_folder_is_recursive() {
    let (store, _observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();
    store.clear_calls();

    sync.delete_node(&docs).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![StoreCall::Delete {
            id: docs.clone(),
            recursive: true
        }]
    );
    assert!(sync.node(&docs).is_none());
    assert!(!store.exists(&docs));
}

#[tokio::test]
async fn test_delete_empty_folder_detaches_only_target() {
    let (store, observer, mut sync) = common::setup(100);
    common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let root = RemoteId::root();
    let empty = sync.root().child_by_name("Empty").unwrap().id().clone();
    let mut expected = child_set(sync.root());
    expected.retain(|(id, _, _)| id != empty.as_str());
    store.clear_calls();

    sync.delete_node(&empty).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![StoreCall::Delete {
            id: empty.clone(),
            recursive: false
        }]
    );
    assert_eq!(child_set(sync.root()), expected);
    assert_eq!(*observer.refreshed.lock().unwrap(), vec![root.clone(), root]);
}

#[tokio::test]
async fn test_delete_declined_by_remote_keeps_tree() {
    let (store, observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let before = sync.root().clone();
    store.fail_next(StoreOp::Delete, RemoteError::FolderNotEmpty);

    let err = sync.delete_node(&docs).await.unwrap_err();

    assert_eq!(err, SyncError::NotEmpty);
    assert_eq!(sync.root(), &before);
    assert_eq!(
        *observer.errors.lock().unwrap(),
        vec![(docs, ErrorKind::NotEmpty)]
    );
}

#[tokio::test]
async fn test_rename_conflict_keeps_name() {
    let (store, _observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let readme = sync.root().child_by_name("readme.md").unwrap().id().clone();

    let err = sync.rename(&readme, "docs").await.unwrap_err();

    assert_eq!(
        err,
        SyncError::NameConflict {
            conflicting_id: Some(docs)
        }
    );
    let node = sync.node(&readme).unwrap();
    assert_eq!(node.name(), "readme.md");
    assert_eq!(node.state(), NodeState::Loaded);
}

#[tokio::test]
async fn test_stale_node_can_be_renamed_again_and_refreshed() {
    let (store, _observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();

    sync.rename(&docs, "Papers").await.unwrap();
    assert_eq!(sync.node(&docs).unwrap().state(), NodeState::Stale);
    sync.rename(&docs, "Reports").await.unwrap();
    sync.refresh(&RemoteId::root()).await.unwrap();

    let node = sync.node(&docs).unwrap();
    assert_eq!(node.name(), "Reports");
    assert_eq!(node.state(), NodeState::Loaded);
}

#[tokio::test]
async fn test_create_folder_refreshes_parent() {
    let (store, observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let passes = store.listing_passes(&docs);

    let id = sync.create_folder(&docs, "2024").await.unwrap();

    let created = sync.node(&id).unwrap();
    assert_eq!(created.name(), "2024");
    assert_eq!(created.parent(), Some(&docs));
    assert_eq!(store.listing_passes(&docs), passes + 1);
    assert_eq!(sync.node(&docs).unwrap().state(), NodeState::Loaded);
    assert_eq!(observer.refreshed.lock().unwrap().last(), Some(&docs));
}

#[tokio::test]
async fn test_create_folder_conflict_changes_nothing() {
    let (store, _observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let root = RemoteId::root();
    let before = child_set(sync.root());
    store.clear_calls();

    let err = sync.create_folder(&root, "Docs").await.unwrap_err();

    assert_eq!(
        err,
        SyncError::NameConflict {
            conflicting_id: Some(docs)
        }
    );
    assert_eq!(child_set(sync.root()), before);
    assert_eq!(
        store.calls(),
        vec![StoreCall::CreateChild {
            parent: root,
            name: "Docs".to_string()
        }]
    );
}

#[tokio::test]
async fn test_create_folder_under_file_is_invalid() {
    let (store, _observer, mut sync) = common::setup(100);
    common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let readme = sync.root().child_by_name("readme.md").unwrap().id().clone();
    store.clear_calls();

    let err = sync.create_folder(&readme, "x").await.unwrap_err();

    assert!(matches!(err, SyncError::InvalidOperation(_)));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_upload_batch_with_conflict() {
    let (store, observer, mut sync) = common::setup(100);
    let root = RemoteId::root();
    let existing = store.add_file(&root, "b.txt").unwrap();
    sync.load_root().await.unwrap();
    let passes = store.listing_passes(&root);

    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = ["a.txt", "b.txt", "c.txt"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, name.as_bytes()).unwrap();
            path
        })
        .collect();

    let outcomes = sync.upload_files(&root, &paths).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_uploaded());
    assert_eq!(
        outcomes[1],
        UploadOutcome::Conflict {
            existing: Some(existing)
        }
    );
    assert!(outcomes[2].is_uploaded());
    assert_eq!(store.listing_passes(&root), passes + 1);

    let names: Vec<&str> = sync.root().children().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["b.txt", "a.txt", "c.txt"]);
    assert_eq!(child_set(sync.root()), store_child_set(&store, &root));
    assert_eq!(observer.refreshed.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upload_order_matches_input() {
    let (store, _observer, mut sync) = common::setup(100);
    let root = RemoteId::root();
    sync.load_root().await.unwrap();
    store.clear_calls();

    let paths = vec![PathBuf::from("/data/z.bin"), PathBuf::from("/data/a.bin")];
    sync.upload_files(&root, &paths).await.unwrap();

    let uploads: Vec<String> = store
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::Upload { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(uploads, vec!["z.bin", "a.bin"]);
}

#[tokio::test]
async fn test_upload_outcomes_survive_failed_relisting() {
    let (store, observer, mut sync) = common::setup(100);
    let root = RemoteId::root();
    sync.load_root().await.unwrap();
    store.fail_next(StoreOp::ListChildren, RemoteError::Unavailable("reset".into()));

    let outcomes = sync
        .upload_files(&root, &[PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/b.txt")])
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.is_uploaded()));
    assert_eq!(store.children_of(&root).len(), 2);
    // the listing never arrived: old children, folder left stale
    assert!(sync.root().children().is_empty());
    assert_eq!(sync.root().state(), NodeState::Stale);
    assert_eq!(
        *observer.errors.lock().unwrap(),
        vec![(root.clone(), ErrorKind::RemoteUnavailable)]
    );
    assert_eq!(observer.refreshed.lock().unwrap().len(), 1);

    sync.refresh(&root).await.unwrap();
    assert_eq!(child_set(sync.root()), store_child_set(&store, &root));
    assert_eq!(sync.root().state(), NodeState::Loaded);
}

#[tokio::test]
async fn test_created_folder_id_survives_failed_relisting() {
    let (store, observer, mut sync) = common::setup(100);
    let root = RemoteId::root();
    sync.load_root().await.unwrap();
    store.fail_next(StoreOp::ListChildren, RemoteError::Unavailable("reset".into()));

    let id = sync.create_folder(&root, "Reports").await.unwrap();

    assert!(store.exists(&id));
    assert!(sync.node(&id).is_none());
    assert_eq!(sync.root().state(), NodeState::Stale);
    assert_eq!(
        *observer.errors.lock().unwrap(),
        vec![(root.clone(), ErrorKind::RemoteUnavailable)]
    );

    sync.refresh(&root).await.unwrap();
    assert_eq!(sync.node(&id).unwrap().name(), "Reports");
}
