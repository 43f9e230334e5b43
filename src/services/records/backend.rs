use crate::view::tree::NodeId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;

/// A raw parent/child record as provided by the data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: NodeId,
    /// `None` marks a root record
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub label: String,
}

impl Record {
    pub fn new(id: NodeId, parent_id: Option<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            label: label.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Async record source
///
/// Abstracts the flat record set so that in-memory data, files, or remote
/// services can back the tree. Latency is unbounded and may vary per call.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// All records whose parent is `parent`, in the record set's relative order
    ///
    /// `None` selects the root records. An empty result means "no children",
    /// which is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the record set cannot be accessed.
    async fn records_with_parent(&self, parent: Option<NodeId>) -> io::Result<Vec<Record>>;
}
