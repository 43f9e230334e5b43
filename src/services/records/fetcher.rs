use super::backend::{Record, RecordBackend};
use crate::view::tree::NodeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Failure to retrieve the children of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// The node whose children were requested (`None` for the root batch)
    pub parent: Option<NodeId>,
    pub kind: io::ErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(parent: Option<NodeId>, kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self {
            parent,
            kind,
            message: message.into(),
        }
    }

    pub fn from_io(parent: Option<NodeId>, err: &io::Error) -> Self {
        Self::new(parent, err.kind(), err.to_string())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(id) => write!(f, "failed to fetch children of {id}: {}", self.message),
            None => write!(f, "failed to fetch root nodes: {}", self.message),
        }
    }
}

impl std::error::Error for FetchError {}

type FetchResult = Result<Vec<Record>, FetchError>;

/// Type alias for pending child requests map
type PendingRequests = Arc<Mutex<HashMap<Option<NodeId>, Vec<oneshot::Sender<FetchResult>>>>>;

/// Retrieves children from a record backend
///
/// Concurrent requests for the same parent share one backend lookup and all
/// receive the same result. A result is all matching children or an error,
/// never a subset.
pub struct ChildFetcher {
    backend: Arc<dyn RecordBackend>,
    /// Map of parent -> channels waiting for the in-flight lookup
    pending: PendingRequests,
}

impl fmt::Debug for ChildFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildFetcher")
            .field("backend", &"<dyn RecordBackend>")
            .field("pending", &"<mutex>")
            .finish()
    }
}

impl ChildFetcher {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Children of `parent`, in record order
    pub async fn fetch_children(&self, parent: NodeId) -> FetchResult {
        self.fetch(Some(parent)).await
    }

    /// The root batch (records with no parent)
    pub async fn fetch_roots(&self) -> FetchResult {
        self.fetch(None).await
    }

    async fn fetch(&self, parent: Option<NodeId>) -> FetchResult {
        let (rx, should_execute) = {
            let mut pending = self.pending.lock().await;
            let (tx, rx) = oneshot::channel();

            if let Some(senders) = pending.get_mut(&parent) {
                senders.push(tx);
                (rx, false)
            } else {
                pending.insert(parent, vec![tx]);
                (rx, true)
            }
        };

        if should_execute {
            // The lookup runs detached so that dropping the caller's future
            // still clears the pending entry and answers every waiter.
            let fetcher = self.clone();
            tokio::spawn(async move {
                let result = fetcher.lookup(parent).await;

                let mut pending = fetcher.pending.lock().await;
                if let Some(senders) = pending.remove(&parent) {
                    for sender in senders {
                        let _ = sender.send(result.clone());
                    }
                }
            });
        } else {
            tracing::trace!(?parent, "joining in-flight child fetch");
        }

        rx.await.unwrap_or_else(|_| {
            Err(FetchError::new(
                parent,
                io::ErrorKind::Interrupted,
                "request cancelled",
            ))
        })
    }

    async fn lookup(&self, parent: Option<NodeId>) -> FetchResult {
        let records = self
            .backend
            .records_with_parent(parent)
            .await
            .map_err(|e| FetchError::from_io(parent, &e))?;

        if let Some(stray) = records.iter().find(|r| r.parent_id != parent) {
            return Err(FetchError::new(
                parent,
                io::ErrorKind::InvalidData,
                format!("backend returned record {} with a different parent", stray.id),
            ));
        }

        let mut seen = HashSet::with_capacity(records.len());
        if let Some(repeated) = records.iter().find(|r| !seen.insert(r.id)) {
            return Err(FetchError::new(
                parent,
                io::ErrorKind::InvalidData,
                format!("backend returned record {} more than once", repeated.id),
            ));
        }

        tracing::debug!(?parent, count = records.len(), "fetched children");
        Ok(records)
    }

    pub fn backend(&self) -> &Arc<dyn RecordBackend> {
        &self.backend
    }
}

impl Clone for ChildFetcher {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            pending: Arc::clone(&self.pending),
        }
    }
}
