use crate::common::fixtures::{labeled, rec, TestTree};
use crate::common::tracing::init_tracing_from_env;
use lazytree::config::{ExpandAllMode, TreeConfig};
use lazytree::services::records::SlowBackendConfig;
use lazytree::view::tree::{
    render_outline, NodeId, ProjectedRow, RowKind, TreeNodeStore, TreeView,
};
use std::time::Duration;

fn ids(rows: &[ProjectedRow]) -> Vec<u64> {
    rows.iter().map(|r| r.node_id().0).collect()
}

/// Root 1 is already loaded with children 2 and 3; node 2 is fetched on demand
#[tokio::test]
async fn test_expand_loaded_root_then_fetch_grandchild() {
    init_tracing_from_env();
    let tree = TestTree::new(vec![rec(1, None), rec(2, Some(1)), rec(3, Some(1)), rec(4, Some(2))]);

    let mut store = TreeNodeStore::with_roots(vec![rec(1, None)]).unwrap();
    store.begin_load(NodeId(1)).unwrap();
    store
        .complete_load(NodeId(1), vec![rec(2, Some(1)), rec(3, Some(1))])
        .unwrap();
    let mut view = tree.view_over(store, &TreeConfig::default());

    let projection = view.expand(NodeId(1)).unwrap();
    assert_eq!(ids(&projection.rows), vec![1, 2, 3]);
    assert!(!projection.rows[1].expanded && !projection.rows[1].loaded);
    assert_eq!(tree.calls_for(1).await, 0);

    let projection = view.expand(NodeId(2)).unwrap();
    assert_eq!(
        projection.rows[2].kind,
        RowKind::LoadingPlaceholder(NodeId(2))
    );

    let projection = view.settle().await;
    assert_eq!(ids(&projection.rows), vec![1, 2, 4, 3]);
    let depths: Vec<_> = projection.rows.iter().map(|r| r.depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 1]);
    assert_eq!(tree.calls_for(2).await, 1);
}

/// A node with no matching records loads to an empty child list
#[tokio::test]
async fn test_expand_leaf_loads_empty_children() {
    let tree = TestTree::new(vec![rec(5, None)]);
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(5)).unwrap();
    let projection = view.settle().await;

    assert_eq!(ids(&projection.rows), vec![5]);
    assert!(projection.rows[0].expanded);
    assert!(projection.rows[0].loaded);
    assert!(!projection.rows[0].is_errored());
    assert_eq!(
        view.store().get_node(NodeId(5)).unwrap().children,
        Some(Vec::new())
    );
}

/// Collapsing and re-expanding reuses what was fetched
#[tokio::test]
async fn test_collapse_and_reexpand_does_not_refetch() {
    let tree = TestTree::new(vec![rec(1, None), rec(2, Some(1)), rec(3, Some(2))]);
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(1)).unwrap();
    view.settle().await;
    view.expand(NodeId(2)).unwrap();
    view.settle().await;

    assert_eq!(ids(&view.collapse(NodeId(1)).rows), vec![1]);
    // Node 2 stays in the expansion set while hidden
    assert!(view.controller().is_expanded(NodeId(2)));

    let projection = view.expand(NodeId(1)).unwrap();
    assert_eq!(ids(&projection.rows), vec![1, 2, 3]);
    assert_eq!(view.controller().in_flight(), 0);
    assert_eq!(tree.calls_for(1).await, 1);
    assert_eq!(tree.calls_for(2).await, 1);
}

/// Discovered nodes whose ancestors are all expanded
fn reachable_count(view: &TreeView) -> usize {
    let expanded = view.controller().expanded();
    view.store()
        .all_nodes()
        .filter(|node| {
            let chain = view.store().ancestors(node.id);
            chain[..chain.len() - 1].iter().all(|id| expanded.contains(id))
        })
        .count()
}

fn subtree_from(view: &mut TreeView, id: NodeId) -> Vec<ProjectedRow> {
    let projection = view.projection();
    let start = projection.index_of(id).unwrap();
    projection.rows[start..].to_vec()
}

/// Expanding one sibling never disturbs another's subtree
#[tokio::test]
async fn test_sibling_subtrees_are_independent() {
    let tree = TestTree::new(vec![
        rec(1, None),
        rec(2, None),
        rec(10, Some(1)),
        rec(11, Some(1)),
        rec(100, Some(10)),
        rec(20, Some(2)),
        rec(21, Some(2)),
    ]);
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(2)).unwrap();
    view.settle().await;
    let sibling = subtree_from(&mut view, NodeId(2));
    assert_eq!(ids(&sibling), vec![2, 20, 21]);
    let len = view.projection().len();
    assert_eq!(len, reachable_count(&view));

    // Expanded and loaded next to it
    view.expand(NodeId(1)).unwrap();
    view.settle().await;
    assert_eq!(ids(&view.projection().rows), vec![1, 10, 11, 2, 20, 21]);
    assert_eq!(subtree_from(&mut view, NodeId(2)), sibling);
    let len = view.projection().len();
    assert_eq!(len, reachable_count(&view));

    // One level deeper
    view.expand(NodeId(10)).unwrap();
    view.settle().await;
    assert_eq!(ids(&view.projection().rows), vec![1, 10, 100, 11, 2, 20, 21]);
    assert_eq!(subtree_from(&mut view, NodeId(2)), sibling);
    let len = view.projection().len();
    assert_eq!(len, reachable_count(&view));

    view.collapse(NodeId(1));
    assert_eq!(subtree_from(&mut view, NodeId(2)), sibling);
    let len = view.projection().len();
    assert_eq!(len, reachable_count(&view));
}

/// Completions land in whatever order the source answers
#[tokio::test]
async fn test_out_of_order_completions() {
    let config = SlowBackendConfig::none()
        .with_parent_delay(Some(NodeId(1)), Duration::from_millis(80))
        .with_parent_delay(Some(NodeId(2)), Duration::from_millis(5));
    let tree = TestTree::with_backend_config(
        vec![rec(1, None), rec(2, None), rec(11, Some(1)), rec(22, Some(2))],
        config,
    );
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(1)).unwrap();
    view.expand(NodeId(2)).unwrap();

    // Node 2 answers first while node 1 is still loading
    while !view.store().get_node(NodeId(2)).unwrap().is_loaded() {
        tokio::time::sleep(Duration::from_millis(1)).await;
        view.process_completions();
    }
    let projection = view.projection();
    assert_eq!(ids(&projection.rows), vec![1, 1, 2, 22]);
    assert!(projection.rows[1].is_placeholder());

    let projection = view.settle().await;
    assert_eq!(ids(&projection.rows), vec![1, 11, 2, 22]);
}

#[tokio::test]
async fn test_expand_all_loaded_only_stops_at_frontier() {
    let tree = TestTree::new(vec![rec(1, None), rec(2, Some(1)), rec(3, Some(2))]);
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(1)).unwrap();
    view.settle().await;
    view.collapse_all();

    let projection = view.expand_all();
    assert_eq!(ids(&projection.rows), vec![1, 2]);
    assert!(projection.rows[1].expanded);
    assert!(!projection.rows[1].loaded);
    assert_eq!(view.controller().in_flight(), 0);
    assert_eq!(tree.calls_for(2).await, 0);
}

#[tokio::test]
async fn test_expand_all_fetch_frontier_goes_one_level_per_call() {
    let tree = TestTree::new(vec![rec(1, None), rec(2, Some(1)), rec(3, Some(2))]);
    let config = TreeConfig {
        expand_all: ExpandAllMode::FetchFrontier,
        ..TreeConfig::default()
    };
    let mut view = tree.open(&config).await;

    view.expand_all();
    assert_eq!(ids(&view.settle().await.rows), vec![1, 2]);

    view.expand_all();
    assert_eq!(ids(&view.settle().await.rows), vec![1, 2, 3]);

    view.expand_all();
    view.settle().await;
    for id in 1..=3 {
        assert_eq!(tree.calls_for(id).await, 1);
    }
}

#[tokio::test]
async fn test_collapse_all_shows_only_roots() {
    let tree = TestTree::new(vec![rec(1, None), rec(2, Some(1)), rec(3, None), rec(4, Some(3))]);
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(1)).unwrap();
    view.expand(NodeId(3)).unwrap();
    view.settle().await;
    assert_eq!(view.projection().len(), 4);

    let projection = view.collapse_all();
    assert_eq!(ids(&projection.rows), vec![1, 3]);
    assert!(view.controller().expanded().is_empty());
}

#[tokio::test]
async fn test_store_revision_notifies_watchers() {
    let tree = TestTree::new(vec![rec(1, None), rec(2, Some(1))]);
    let mut view = tree.open(&TreeConfig::default()).await;
    let mut watcher = view.store().subscribe();
    let seen = *watcher.borrow_and_update();

    view.expand(NodeId(1)).unwrap();
    view.settle().await;

    assert!(watcher.has_changed().unwrap());
    assert!(*watcher.borrow_and_update() > seen);
}

#[tokio::test]
async fn test_rendered_outline() {
    let tree = TestTree::new(vec![
        labeled(1, None, "Animals"),
        labeled(2, Some(1), "Birds"),
        labeled(3, Some(2), "Heron"),
        labeled(4, Some(1), "Fish"),
        labeled(5, None, "Plants"),
    ]);
    let mut view = tree.open(&TreeConfig::default()).await;

    view.expand(NodeId(1)).unwrap();
    view.settle().await;
    view.expand(NodeId(2)).unwrap();
    view.expand(NodeId(5)).unwrap();

    insta::assert_snapshot!(render_outline(&view.projection().rows), @r"
    ▼ Animals
      ▼ Birds
        ⟳ Loading...
      > Fish
    ▼ Plants
      ⟳ Loading...
    ");

    view.settle().await;
    insta::assert_snapshot!(render_outline(&view.projection().rows), @r"
    ▼ Animals
      ▼ Birds
        > Heron
      > Fish
    ▼ Plants
    ");
}
