use super::node::{LoadState, NodeId, TreeNode};
use crate::services::records::{FetchError, Record};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::watch;

/// Rejected store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No node with this id has been discovered
    UnknownNode(NodeId),
    /// A fetch for this node is already in flight
    AlreadyLoading(NodeId),
    /// Children are already loaded
    AlreadyLoaded(NodeId),
    /// A completion or failure arrived for a node that is not loading
    NotLoading(NodeId),
    /// A record does not belong under the node it was delivered for
    ParentMismatch {
        parent: Option<NodeId>,
        child: NodeId,
        actual: Option<NodeId>,
    },
    /// The same child appears twice in one batch
    DuplicateChild { parent: NodeId, child: NodeId },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::UnknownNode(id) => write!(f, "unknown node {id}"),
            TreeError::AlreadyLoading(id) => write!(f, "{id} is already loading"),
            TreeError::AlreadyLoaded(id) => write!(f, "{id} already has its children"),
            TreeError::NotLoading(id) => write!(f, "{id} has no fetch in flight"),
            TreeError::ParentMismatch {
                parent,
                child,
                actual,
            } => write!(
                f,
                "{child} delivered under {} but its parent is {}",
                describe(*parent),
                describe(*actual)
            ),
            TreeError::DuplicateChild { parent, child } => {
                write!(f, "{child} delivered twice under {parent}")
            }
        }
    }
}

impl std::error::Error for TreeError {}

fn describe(id: Option<NodeId>) -> String {
    id.map_or_else(|| "the root".to_string(), |id| id.to_string())
}

/// Structural state of every node discovered so far
///
/// Nodes are keyed by id and only change through `begin_load`,
/// `complete_load` and `fail_load`. Discovered nodes are never removed, so
/// collapsing and re-expanding never refetches. Every successful mutation
/// bumps the revision, which observers can watch.
#[derive(Debug)]
pub struct TreeNodeStore {
    /// All nodes indexed by ID
    nodes: HashMap<NodeId, TreeNode>,
    /// Root nodes in record order
    roots: Vec<NodeId>,
    revision: u64,
    notifier: watch::Sender<u64>,
}

impl Default for TreeNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeNodeStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(0);
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            revision: 0,
            notifier,
        }
    }

    /// Create a store holding an initial root batch
    pub fn with_roots(records: Vec<Record>) -> Result<Self, TreeError> {
        let mut store = Self::new();
        store.insert_roots(records)?;
        Ok(store)
    }

    /// Register root records; roots already present are left untouched
    pub fn insert_roots(&mut self, records: Vec<Record>) -> Result<(), TreeError> {
        if let Some(stray) = records.iter().find(|r| r.parent_id.is_some()) {
            return Err(TreeError::ParentMismatch {
                parent: None,
                child: stray.id,
                actual: stray.parent_id,
            });
        }

        for record in &records {
            if !self.nodes.contains_key(&record.id) {
                self.nodes.insert(record.id, TreeNode::from_record(record));
                self.roots.push(record.id);
            }
        }
        self.bump();
        Ok(())
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Root node IDs in record order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Get all nodes
    pub fn all_nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Number of discovered nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes with a fetch in flight
    pub fn loading_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_loading())
            .map(|n| n.id)
            .collect()
    }

    /// Mark a node as loading
    ///
    /// Rejects a second concurrent load of the same node.
    pub fn begin_load(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))?;
        match node.state {
            LoadState::Loading => return Err(TreeError::AlreadyLoading(id)),
            LoadState::Loaded => return Err(TreeError::AlreadyLoaded(id)),
            LoadState::Unfetched | LoadState::Failed(_) => {}
        }

        node.state = LoadState::Loading;
        tracing::debug!(%id, "begin load");
        self.bump();
        Ok(())
    }

    /// Store fetched children and clear the loading flag
    ///
    /// Children not yet known are registered; known ones keep their state.
    /// The batch is validated before anything changes.
    pub fn complete_load(&mut self, id: NodeId, children: Vec<Record>) -> Result<(), TreeError> {
        let node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        if !node.is_loading() {
            return Err(TreeError::NotLoading(id));
        }

        let mut seen = HashSet::with_capacity(children.len());
        for record in &children {
            if !seen.insert(record.id) {
                return Err(TreeError::DuplicateChild {
                    parent: id,
                    child: record.id,
                });
            }
            let actual = self
                .nodes
                .get(&record.id)
                .map_or(record.parent_id, |known| known.parent);
            if actual != Some(id) || record.parent_id != Some(id) {
                return Err(TreeError::ParentMismatch {
                    parent: Some(id),
                    child: record.id,
                    actual,
                });
            }
        }

        let mut child_ids = Vec::with_capacity(children.len());
        for record in &children {
            self.nodes
                .entry(record.id)
                .or_insert_with(|| TreeNode::from_record(record));
            child_ids.push(record.id);
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = Some(child_ids);
            node.state = LoadState::Loaded;
        }
        tracing::debug!(%id, count = children.len(), "complete load");
        self.bump();
        Ok(())
    }

    /// Record a failed fetch; the node keeps no children and may be retried
    pub fn fail_load(&mut self, id: NodeId, error: FetchError) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))?;
        if !node.is_loading() {
            return Err(TreeError::NotLoading(id));
        }

        tracing::warn!(%id, %error, "load failed");
        node.children = None;
        node.state = LoadState::Failed(error);
        self.bump();
        Ok(())
    }

    /// Get the parent chain for a node (from root to node)
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.get_node(id).map(|n| n.id);

        while let Some(node_id) = current {
            ancestors.push(node_id);
            current = self.get_node(node_id).and_then(|n| n.parent);
        }

        ancestors.reverse();
        ancestors
    }

    /// Get the depth of a node (roots are 0)
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let ancestors = self.ancestors(id);
        ancestors.len().checked_sub(1)
    }

    /// Structural revision, bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Watch structural changes; the value is the latest revision
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.notifier.send_replace(self.revision);
    }
}
