//! Subtree builds, pagination and refresh

use std::sync::Arc;

use boxtree_core::domain::{ErrorKind, NodeKind, NodeState, RemoteId, SyncError};
use boxtree_core::ports::{RemoteEntry, RemoteError};
use boxtree_sync::memory::{StoreCall, StoreOp};
use boxtree_sync::TreeSynchronizer;

use crate::common::{self, child_set, store_child_set};

#[tokio::test]
async fn test_child_sets_do_not_depend_on_page_size() {
    for page_limit in 1..=10 {
        let (store, _observer, mut sync) = common::setup(page_limit);
        let docs = common::seed_tree(&store);

        sync.load_root().await.unwrap();

        let root = RemoteId::root();
        assert_eq!(
            child_set(sync.root()),
            store_child_set(&store, &root),
            "page_limit={page_limit}"
        );
        let docs_node = sync.node(&docs).unwrap();
        assert_eq!(
            child_set(docs_node),
            store_child_set(&store, &docs),
            "page_limit={page_limit}"
        );
        assert_eq!(sync.root().descendant_count(), 13, "page_limit={page_limit}");
    }
}

#[tokio::test]
async fn test_listing_advances_offset_until_short_page() {
    let (store, _observer, mut sync) = common::setup(4);
    let docs = common::seed_tree(&store);

    sync.load_root().await.unwrap();

    // Docs holds 8 entries: two full pages and an empty one
    let offsets: Vec<u64> = store
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::ListChildren { id, offset, limit } if id == docs => {
                assert_eq!(limit, 4);
                Some(offset)
            }
            _ => None,
        })
        .collect();
    assert_eq!(offsets, vec![0, 4, 8]);
}

#[tokio::test]
async fn test_duplicate_entries_across_pages_are_dropped() {
    let entry = |id: &str, name: &str| RemoteEntry::new(common::id(id), name, NodeKind::File);
    let store = Arc::new(common::ScriptedListing::new(vec![
        (0, vec![entry("1", "a"), entry("2", "b")]),
        // "b" shifted onto the second page
        (2, vec![entry("2", "b"), entry("3", "c")]),
        (4, vec![entry("4", "d")]),
    ]));
    let mut sync = TreeSynchronizer::new(store, common::sync_config(2));

    sync.load_root().await.unwrap();

    let ids: Vec<String> = sync
        .root()
        .child_ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_repeated_full_page_does_not_end_listing() {
    let entry = |id: &str, name: &str| RemoteEntry::new(common::id(id), name, NodeKind::File);
    // two entries inserted ahead of the cursor push page one onto page two
    let store = Arc::new(common::ScriptedListing::new(vec![
        (0, vec![entry("1", "a"), entry("2", "b")]),
        (2, vec![entry("1", "a"), entry("2", "b")]),
        (4, vec![entry("3", "c")]),
    ]));
    let mut sync = TreeSynchronizer::new(store, common::sync_config(2));

    sync.load_root().await.unwrap();

    let ids: Vec<String> = sync
        .root()
        .child_ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_listing_without_short_page_fails_at_page_cap() {
    let entry = |id: &str, name: &str| RemoteEntry::new(common::id(id), name, NodeKind::File);
    let store = Arc::new(
        common::ScriptedListing::new(Vec::new())
            .with_fallback(vec![entry("1", "a"), entry("2", "b")]),
    );
    let observer = Arc::new(common::RecordingObserver::default());
    let mut config = common::sync_config(2);
    config.max_pages = 5;
    let mut sync = TreeSynchronizer::new(store, config).with_observer(observer.clone());

    let err = sync.load_root().await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteUnavailable(_)), "{err:?}");
    assert!(sync.root().children().is_empty());
    assert_eq!(sync.root().state(), NodeState::Unloaded);
    assert_eq!(
        *observer.errors.lock().unwrap(),
        vec![(RemoteId::root(), ErrorKind::RemoteUnavailable)]
    );
}

#[tokio::test]
async fn test_empty_folder_has_no_children() {
    let (store, _observer, mut sync) = common::setup(5);
    common::seed_tree(&store);

    sync.load_root().await.unwrap();

    let empty = sync.root().child_by_name("Empty").unwrap();
    assert!(empty.children().is_empty());
    assert_eq!(empty.state(), NodeState::Loaded);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (store, _observer, mut sync) = common::setup(3);
    let docs = common::seed_tree(&store);
    sync.load_root().await.unwrap();

    sync.refresh(&docs).await.unwrap();
    let first = child_set(sync.node(&docs).unwrap());
    sync.refresh(&docs).await.unwrap();
    let second = child_set(sync.node(&docs).unwrap());

    assert_eq!(first, second);
    assert_eq!(first, store_child_set(&store, &docs));
}

#[tokio::test]
async fn test_refresh_picks_up_remote_changes() {
    let (store, observer, mut sync) = common::setup(100);
    let docs = common::seed_tree(&store);
    let root = RemoteId::root();
    sync.load_root().await.unwrap();

    store.remove(&docs);
    let added = store.add_file(&root, "notes.md").unwrap();
    sync.refresh(&root).await.unwrap();

    assert!(sync.node(&docs).is_none());
    let node = sync.node(&added).unwrap();
    assert_eq!(node.parent(), Some(&root));
    assert_eq!(node.kind(), NodeKind::File);
    assert_eq!(child_set(sync.root()), store_child_set(&store, &root));
    assert_eq!(*observer.refreshed.lock().unwrap(), vec![root.clone(), root]);
}

#[tokio::test]
async fn test_failed_refresh_leaves_tree_unchanged() {
    let (store, observer, mut sync) = common::setup(100);
    common::seed_tree(&store);
    let root = RemoteId::root();
    sync.load_root().await.unwrap();
    let before = sync.root().clone();

    store.add_file(&root, "late.txt").unwrap();
    store.fail_next(
        StoreOp::ListChildren,
        RemoteError::Unavailable("connection reset".into()),
    );
    let err = sync.refresh(&root).await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteUnavailable(_)));
    assert_eq!(sync.root(), &before);
    assert_eq!(
        *observer.errors.lock().unwrap(),
        vec![(root, ErrorKind::RemoteUnavailable)]
    );
}

#[tokio::test]
async fn test_refresh_on_file_is_invalid() {
    let (store, _observer, mut sync) = common::setup(100);
    common::seed_tree(&store);
    sync.load_root().await.unwrap();
    let readme = sync.root().child_by_name("readme.md").unwrap().id().clone();
    store.clear_calls();

    let err = sync.refresh(&readme).await.unwrap_err();

    assert!(matches!(err, SyncError::InvalidOperation(_)));
    assert_eq!(store.call_count(), 0);
}
