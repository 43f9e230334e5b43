use crate::services::records::{FetchError, Record};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Structural (fetch) state of a node's children
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// Children never requested
    Unfetched,
    /// A fetch for the children is in flight
    Loading,
    /// Children fetched (possibly empty)
    Loaded,
    /// Last fetch failed; eligible for retry
    Failed(FetchError),
}

/// A node discovered so far
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Unique identifier
    pub id: NodeId,
    /// Display string, opaque to the engine
    pub label: String,
    /// Parent node ID (None for roots)
    pub parent: Option<NodeId>,
    /// Child node IDs in fetch order. `None` until loaded.
    pub children: Option<Vec<NodeId>>,
    /// Fetch state of the children
    pub state: LoadState,
}

impl TreeNode {
    /// Create an unfetched node from a backing record
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id,
            label: record.label.clone(),
            parent: record.parent_id,
            children: None,
            state: LoadState::Unfetched,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// True exactly while a fetch for this node's children is in flight
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, LoadState::Failed(_))
    }

    /// Unfetched or failed: an expansion should start a fetch
    pub fn needs_fetch(&self) -> bool {
        matches!(self.state, LoadState::Unfetched | LoadState::Failed(_))
    }

    /// Error recorded by the last failed fetch
    pub fn error(&self) -> Option<&FetchError> {
        match &self.state {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Loaded children, empty when absent
    pub fn child_ids(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }
}
