use crate::common::fixtures::{rec, TestTree};
use async_trait::async_trait;
use lazytree::config::TreeConfig;
use lazytree::services::records::{ChildFetcher, Record, RecordBackend};
use lazytree::view::tree::{render_outline, NodeId, OpenError, TreeView};
use std::io;
use std::sync::Arc;

/// A failed fetch marks the node errored; expanding again retries
#[tokio::test]
async fn test_failure_marks_node_and_expand_retries() {
    let tree = TestTree::new(vec![rec(7, None), rec(8, Some(7))]);
    tree.backend.fail_parent(Some(NodeId(7))).await;
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(7)).unwrap();
    let projection = view.settle().await;
    assert_eq!(projection.len(), 1);
    let row = &projection.rows[0];
    assert!(row.expanded);
    assert!(row.is_errored());
    assert!(!row.loading && !row.loaded);
    assert_eq!(
        row.error.as_ref().unwrap().kind,
        io::ErrorKind::ConnectionReset
    );

    // Nothing is retried until asked
    assert_eq!(view.controller().in_flight(), 0);
    assert_eq!(tree.calls_for(7).await, 1);

    tree.backend.heal_parent(Some(NodeId(7))).await;
    view.expand(NodeId(7)).unwrap();
    let projection = view.settle().await;

    assert_eq!(render_outline(&projection.rows), "▼ n7\n  > n8");
    assert_eq!(tree.calls_for(7).await, 2);
}

#[tokio::test]
async fn test_toggle_off_and_on_retries_failed_node() {
    let tree = TestTree::new(vec![rec(7, None), rec(8, Some(7))]);
    tree.backend.fail_parent(Some(NodeId(7))).await;
    let mut view = tree.open(&TreeConfig::default()).await;

    view.toggle(NodeId(7)).unwrap();
    view.settle().await;
    tree.backend.heal_parent(Some(NodeId(7))).await;

    // Collapsing a failed node does not fetch
    view.toggle(NodeId(7)).unwrap();
    assert_eq!(view.controller().in_flight(), 0);

    view.toggle(NodeId(7)).unwrap();
    assert_eq!(view.controller().in_flight(), 1);
    let projection = view.settle().await;
    assert_eq!(projection.len(), 2);
}

#[tokio::test]
async fn test_failure_leaves_siblings_alone() {
    let tree = TestTree::new(vec![rec(1, None), rec(2, None), rec(20, Some(2))]);
    tree.backend.fail_parent(Some(NodeId(1))).await;
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(1)).unwrap();
    view.expand(NodeId(2)).unwrap();
    let projection = view.settle().await;

    assert!(projection.rows[0].is_errored());
    assert_eq!(projection.node_ids(), vec![NodeId(1), NodeId(2), NodeId(20)]);
    assert!(!projection.rows[1].is_errored());
}

#[tokio::test]
async fn test_roots_unavailable() {
    let tree = TestTree::new(vec![rec(1, None)]);
    tree.backend.fail_parent(None).await;

    let result = TreeView::open(
        tree.fetcher.clone(),
        &TreeConfig::default(),
        tokio::runtime::Handle::current(),
    )
    .await;

    match result {
        Err(OpenError::Fetch(e)) => assert_eq!(e.parent, None),
        other => panic!("expected fetch error, got {:?}", other.map(|_| ())),
    }
}

/// Backend that answers child lookups with a record of the wrong parent
struct MisroutingBackend;

#[async_trait]
impl RecordBackend for MisroutingBackend {
    async fn records_with_parent(&self, parent: Option<NodeId>) -> io::Result<Vec<Record>> {
        Ok(match parent {
            None => vec![rec(1, None)],
            Some(_) => vec![rec(2, Some(1)), rec(3, Some(99))],
        })
    }
}

/// Stray records fail the whole fetch instead of leaking a partial list
#[tokio::test]
async fn test_misrouted_children_fail_whole_fetch() {
    let fetcher = ChildFetcher::new(Arc::new(MisroutingBackend));
    let mut view = TreeView::open(
        fetcher,
        &TreeConfig::default(),
        tokio::runtime::Handle::current(),
    )
    .await
    .unwrap();

    view.expand(NodeId(1)).unwrap();
    let projection = view.settle().await;

    assert_eq!(projection.len(), 1);
    let error = projection.rows[0].error.as_ref().unwrap();
    assert_eq!(error.kind, io::ErrorKind::InvalidData);
    assert!(view.store().get_node(NodeId(2)).is_none());
}

/// Backend that lists the same child twice
struct RepeatingBackend;

#[async_trait]
impl RecordBackend for RepeatingBackend {
    async fn records_with_parent(&self, parent: Option<NodeId>) -> io::Result<Vec<Record>> {
        Ok(match parent {
            None => vec![rec(1, None)],
            Some(_) => vec![rec(2, Some(1)), rec(2, Some(1))],
        })
    }
}

/// A repeated child id fails the fetch instead of showing the child twice
#[tokio::test]
async fn test_repeated_children_fail_whole_fetch() {
    let fetcher = ChildFetcher::new(Arc::new(RepeatingBackend));
    let mut view = TreeView::open(
        fetcher,
        &TreeConfig::default(),
        tokio::runtime::Handle::current(),
    )
    .await
    .unwrap();

    view.expand(NodeId(1)).unwrap();
    let projection = view.settle().await;

    assert_eq!(projection.node_ids(), vec![NodeId(1)]);
    let error = projection.rows[0].error.as_ref().unwrap();
    assert_eq!(error.kind, io::ErrorKind::InvalidData);
    assert!(view.store().get_node(NodeId(2)).is_none());
}
