use super::node::NodeId;
use super::store::{TreeError, TreeNodeStore};
use crate::config::ExpandAllMode;
use crate::services::records::{ChildFetcher, FetchError, Record};
use std::collections::HashSet;
use std::io;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Result of a child fetch, delivered back to the controller
#[derive(Debug)]
pub struct FetchCompletion {
    pub node: NodeId,
    pub result: Result<Vec<Record>, FetchError>,
}

/// What `expand` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Already expanded with nothing left to fetch
    AlreadyExpanded,
    /// Added to the expansion set; children were already loaded
    Expanded,
    /// A fetch for the children was started
    FetchStarted,
    /// A fetch was already in flight; its completion will reveal the children
    AwaitingFetch,
}

/// Owns the expansion set and drives lazy loading
///
/// Fetches run as tasks on the given runtime and report back through a
/// channel. Their results are applied only by the owner, through
/// `process_completions`, `next_completion` or `settle`, so every store and
/// expansion mutation happens synchronously on the owner's side.
///
/// A failed node is retried only when it is explicitly expanded again.
/// Nothing retries on its own.
#[derive(Debug)]
pub struct ExpansionController {
    store: TreeNodeStore,
    expanded: HashSet<NodeId>,
    /// Bumped whenever the expansion set changes
    revision: u64,
    fetcher: ChildFetcher,
    runtime: Handle,
    expand_all_mode: ExpandAllMode,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    in_flight: usize,
}

impl ExpansionController {
    pub fn new(store: TreeNodeStore, fetcher: ChildFetcher, runtime: Handle) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            store,
            expanded: HashSet::new(),
            revision: 0,
            fetcher,
            runtime,
            expand_all_mode: ExpandAllMode::default(),
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn with_expand_all_mode(mut self, mode: ExpandAllMode) -> Self {
        self.expand_all_mode = mode;
        self
    }

    pub fn store(&self) -> &TreeNodeStore {
        &self.store
    }

    /// The expansion set
    pub fn expanded(&self) -> &HashSet<NodeId> {
        &self.expanded
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    /// Expansion revision, bumped whenever the set changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of fetches started but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn expand_all_mode(&self) -> ExpandAllMode {
        self.expand_all_mode
    }

    /// Seed the expansion set without fetching anything
    pub fn seed(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let before = self.expanded.len();
        self.expanded.extend(ids);
        if self.expanded.len() != before {
            self.bump();
        }
    }

    /// Expand a node, fetching its children if they are missing
    ///
    /// A node that is loading gets no second fetch. A node whose last fetch
    /// failed is fetched again, even if it is already expanded.
    pub fn expand(&mut self, id: NodeId) -> Result<ExpandOutcome, TreeError> {
        let node = self.store.get_node(id).ok_or(TreeError::UnknownNode(id))?;
        let needs_fetch = node.needs_fetch();
        let loading = node.is_loading();

        let newly_expanded = self.expanded.insert(id);
        if newly_expanded {
            self.bump();
        }

        if needs_fetch {
            self.start_fetch(id)?;
            return Ok(ExpandOutcome::FetchStarted);
        }
        if loading {
            return Ok(ExpandOutcome::AwaitingFetch);
        }

        Ok(if newly_expanded {
            ExpandOutcome::Expanded
        } else {
            ExpandOutcome::AlreadyExpanded
        })
    }

    /// Collapse a node; in-flight fetches and loaded children are kept
    ///
    /// Returns true if the node was expanded.
    pub fn collapse(&mut self, id: NodeId) -> bool {
        let removed = self.expanded.remove(&id);
        if removed {
            self.bump();
        }
        removed
    }

    /// Collapse if expanded, expand otherwise
    ///
    /// Returns whether the node is expanded afterwards.
    pub fn toggle(&mut self, id: NodeId) -> Result<bool, TreeError> {
        if self.collapse(id) {
            Ok(false)
        } else {
            self.expand(id)?;
            Ok(true)
        }
    }

    /// Expand every node reachable through loaded children
    ///
    /// The set is updated in one step. Nodes whose children are not loaded
    /// are expanded too but stay leaves. With `ExpandAllMode::FetchFrontier`
    /// each of them then gets one fetch; children revealed by those fetches
    /// are not expanded until the next call.
    ///
    /// Returns the number of nodes newly added to the set.
    pub fn expand_all(&mut self) -> usize {
        let mut reachable = Vec::new();
        let mut stack: Vec<NodeId> = self.store.roots().iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            reachable.push(id);
            if let Some(node) = self.store.get_node(id) {
                stack.extend(node.child_ids().iter().rev().copied());
            }
        }

        let before = self.expanded.len();
        self.expanded.extend(reachable.iter().copied());
        let added = self.expanded.len() - before;
        if added > 0 {
            self.bump();
        }

        if self.expand_all_mode == ExpandAllMode::FetchFrontier {
            let frontier: Vec<NodeId> = reachable
                .into_iter()
                .filter(|id| self.store.get_node(*id).is_some_and(|n| n.needs_fetch()))
                .collect();
            tracing::debug!(count = frontier.len(), "expand all: fetching frontier");
            for id in frontier {
                if let Err(e) = self.start_fetch(id) {
                    tracing::warn!(%id, "expand all: could not start fetch: {}", e);
                }
            }
        }

        added
    }

    /// Collapse everything
    pub fn collapse_all(&mut self) {
        if !self.expanded.is_empty() {
            drop(std::mem::take(&mut self.expanded));
            self.bump();
        }
    }

    fn start_fetch(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.store.begin_load(id)?;
        self.in_flight += 1;

        let fetcher = self.fetcher.clone();
        let sender = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = fetcher.fetch_children(id).await;
            let _ = sender.send(FetchCompletion { node: id, result });
        });
        Ok(())
    }

    /// Apply a fetch result to the store
    ///
    /// Applied whether or not the node is still expanded.
    pub fn apply_completion(&mut self, completion: FetchCompletion) -> Result<(), TreeError> {
        let FetchCompletion { node, result } = completion;
        self.in_flight = self.in_flight.saturating_sub(1);

        match result {
            Ok(children) => match self.store.complete_load(node, children) {
                Err(TreeError::ParentMismatch { .. }) => {
                    let error = FetchError::new(
                        Some(node),
                        io::ErrorKind::InvalidData,
                        "fetched children belong to another parent",
                    );
                    self.store.fail_load(node, error)
                }
                Err(e @ TreeError::DuplicateChild { .. }) => {
                    let error =
                        FetchError::new(Some(node), io::ErrorKind::InvalidData, e.to_string());
                    self.store.fail_load(node, error)
                }
                other => other,
            },
            Err(error) => self.store.fail_load(node, error),
        }
    }

    /// Apply every completion that has already arrived, without waiting
    ///
    /// Returns the number applied.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_logged(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next fetch to finish and apply it
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<NodeId> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        let node = completion.node;
        self.apply_logged(completion);
        Some(node)
    }

    /// Wait until every started fetch has been applied
    ///
    /// Fetches have no timeout, so a stalled data source stalls this too.
    pub async fn settle(&mut self) {
        while self.next_completion().await.is_some() {}
    }

    fn apply_logged(&mut self, completion: FetchCompletion) {
        let node = completion.node;
        if let Err(e) = self.apply_completion(completion) {
            tracing::warn!(%node, "dropping fetch result: {}", e);
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
