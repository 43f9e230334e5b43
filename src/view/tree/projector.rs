use super::expansion::ExpansionController;
use super::node::NodeId;
use super::store::TreeNodeStore;
use crate::services::records::FetchError;
use std::collections::HashSet;

/// What a projected row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// A real node
    Node(NodeId),
    /// "Loading..." row under an expanded node whose fetch is in flight
    LoadingPlaceholder(NodeId),
}

/// One visible row, with everything a renderer needs to paint it
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub kind: RowKind,
    /// Indentation level (roots are 0)
    pub depth: usize,
    pub label: String,
    pub expanded: bool,
    pub loading: bool,
    /// Children have been fetched
    pub loaded: bool,
    /// Last fetch failed; expanding again retries
    pub error: Option<FetchError>,
}

impl ProjectedRow {
    /// The node this row belongs to (the owner, for placeholders)
    pub fn node_id(&self) -> NodeId {
        match self.kind {
            RowKind::Node(id) | RowKind::LoadingPlaceholder(id) => id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, RowKind::LoadingPlaceholder(_))
    }

    /// Node to toggle when the row is clicked
    pub fn toggle_target(&self) -> Option<NodeId> {
        match self.kind {
            RowKind::Node(id) => Some(id),
            RowKind::LoadingPlaceholder(_) => None,
        }
    }

    /// Expanded, fetch failed, children absent
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

/// Flattened, depth-tagged view of the visible tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub rows: Vec<ProjectedRow>,
    /// Store revision this was computed from
    pub store_revision: u64,
    /// Expansion revision this was computed from
    pub expansion_revision: u64,
}

impl Projection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProjectedRow> {
        self.rows.get(index)
    }

    /// IDs of the node rows, placeholders skipped
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.rows
            .iter()
            .filter_map(|row| match row.kind {
                RowKind::Node(id) => Some(id),
                RowKind::LoadingPlaceholder(_) => None,
            })
            .collect()
    }

    /// Row index of a node
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.rows.iter().position(|row| row.kind == RowKind::Node(id))
    }
}

/// Computes projections and caches the last one
///
/// The cache is keyed on the store and expansion revisions, so asking again
/// without any state change is free.
#[derive(Debug, Default)]
pub struct TreeProjector {
    cached: Option<Projection>,
}

impl TreeProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a store and expansion set
    ///
    /// Pre-order walk from the roots; children are visited only under
    /// expanded nodes whose children are loaded, so the cost is proportional
    /// to the number of visible rows.
    pub fn project(store: &TreeNodeStore, expanded: &HashSet<NodeId>) -> Vec<ProjectedRow> {
        let mut rows = Vec::new();
        let mut stack: Vec<(NodeId, usize)> =
            store.roots().iter().rev().map(|&id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = store.get_node(id) else {
                continue;
            };
            let is_expanded = expanded.contains(&id);

            rows.push(ProjectedRow {
                kind: RowKind::Node(id),
                depth,
                label: node.label.clone(),
                expanded: is_expanded,
                loading: node.is_loading(),
                loaded: node.is_loaded(),
                error: node.error().cloned(),
            });

            if !is_expanded {
                continue;
            }
            match &node.children {
                Some(children) => {
                    stack.extend(children.iter().rev().map(|&child| (child, depth + 1)));
                }
                None if node.is_loading() => rows.push(ProjectedRow {
                    kind: RowKind::LoadingPlaceholder(id),
                    depth: depth + 1,
                    label: String::new(),
                    expanded: false,
                    loading: true,
                    loaded: false,
                    error: None,
                }),
                None => {}
            }
        }

        rows
    }

    /// Current projection of a controller, recomputed only on change
    pub fn projection(&mut self, controller: &ExpansionController) -> &Projection {
        let store_revision = controller.store().revision();
        let expansion_revision = controller.revision();

        let stale = self.cached.as_ref().map_or(true, |p| {
            p.store_revision != store_revision || p.expansion_revision != expansion_revision
        });
        if stale {
            tracing::trace!(store_revision, expansion_revision, "reprojecting tree");
            self.cached = Some(Projection {
                rows: Self::project(controller.store(), controller.expanded()),
                store_revision,
                expansion_revision,
            });
        }

        self.cached.get_or_insert_with(Projection::default)
    }

    /// Drop the cached projection
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
