use super::expansion::{ExpandOutcome, ExpansionController};
use super::node::NodeId;
use super::projector::{ProjectedRow, Projection, TreeProjector};
use super::store::{TreeError, TreeNodeStore};
use super::viewport::Viewport;
use crate::config::TreeConfig;
use crate::services::records::{ChildFetcher, FetchError};
use std::fmt;
use tokio::runtime::Handle;

/// Failure to build a view from a data source
#[derive(Debug)]
pub enum OpenError {
    /// The root batch could not be fetched
    Fetch(FetchError),
    /// The root batch was malformed
    Tree(TreeError),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::Fetch(e) => write!(f, "could not load roots: {e}"),
            OpenError::Tree(e) => write!(f, "invalid root batch: {e}"),
        }
    }
}

impl std::error::Error for OpenError {}

impl From<FetchError> for OpenError {
    fn from(e: FetchError) -> Self {
        OpenError::Fetch(e)
    }
}

impl From<TreeError> for OpenError {
    fn from(e: TreeError) -> Self {
        OpenError::Tree(e)
    }
}

/// A lazily loaded tree, ready to render
///
/// Every operation hands back the projection it produced, so a renderer can
/// repaint straight from the return value.
#[derive(Debug)]
pub struct TreeView {
    controller: ExpansionController,
    projector: TreeProjector,
    viewport: Viewport,
}

impl TreeView {
    /// Fetch the root batch and build a view over it
    pub async fn open(
        fetcher: ChildFetcher,
        config: &TreeConfig,
        runtime: Handle,
    ) -> Result<Self, OpenError> {
        let roots = fetcher.fetch_roots().await?;
        tracing::debug!(count = roots.len(), "loaded root batch");
        let store = TreeNodeStore::with_roots(roots)?;
        Ok(Self::from_store(store, fetcher, config, runtime))
    }

    /// Build a view over a store that already holds its roots
    pub fn from_store(
        store: TreeNodeStore,
        fetcher: ChildFetcher,
        config: &TreeConfig,
        runtime: Handle,
    ) -> Self {
        let controller = ExpansionController::new(store, fetcher, runtime)
            .with_expand_all_mode(config.expand_all);
        Self {
            controller,
            projector: TreeProjector::new(),
            viewport: Viewport::from_config(&config.viewport),
        }
    }

    pub fn controller(&self) -> &ExpansionController {
        &self.controller
    }

    pub fn store(&self) -> &TreeNodeStore {
        self.controller.store()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Current projection
    pub fn projection(&mut self) -> &Projection {
        let len = self.projector.projection(&self.controller).len();
        self.viewport.clamp(len);
        self.projector.projection(&self.controller)
    }

    pub fn expand(&mut self, id: NodeId) -> Result<&Projection, TreeError> {
        let outcome = self.controller.expand(id)?;
        if outcome == ExpandOutcome::FetchStarted {
            tracing::debug!(%id, "expand started fetch");
        }
        Ok(self.projection())
    }

    pub fn collapse(&mut self, id: NodeId) -> &Projection {
        self.controller.collapse(id);
        self.projection()
    }

    pub fn toggle(&mut self, id: NodeId) -> Result<&Projection, TreeError> {
        self.controller.toggle(id)?;
        Ok(self.projection())
    }

    /// Toggle whatever sits at a row index; placeholder rows do nothing
    pub fn toggle_row(&mut self, index: usize) -> Result<&Projection, TreeError> {
        let target = self
            .projection()
            .get(index)
            .and_then(ProjectedRow::toggle_target);
        if let Some(id) = target {
            self.controller.toggle(id)?;
        }
        Ok(self.projection())
    }

    pub fn expand_all(&mut self) -> &Projection {
        self.controller.expand_all();
        self.projection()
    }

    pub fn collapse_all(&mut self) -> &Projection {
        self.controller.collapse_all();
        self.projection()
    }

    /// Apply finished fetches without waiting
    pub fn process_completions(&mut self) -> &Projection {
        self.controller.process_completions();
        self.projection()
    }

    /// Wait for every in-flight fetch and apply it
    pub async fn settle(&mut self) -> &Projection {
        self.controller.settle().await;
        self.projection()
    }

    /// Scroll so that a node's row is visible
    ///
    /// Returns false if the node has no row in the current projection.
    pub fn reveal(&mut self, id: NodeId) -> bool {
        match self.projection().index_of(id) {
            Some(index) => {
                self.viewport.ensure_visible(index);
                true
            }
            None => false,
        }
    }

    /// Scroll by whole rows
    pub fn scroll_by(&mut self, delta: isize) {
        let len = self.projection().len();
        self.viewport.scroll_by(delta, len);
    }

    /// Rows inside the viewport
    pub fn visible_rows(&mut self) -> &[ProjectedRow] {
        let len = self.projector.projection(&self.controller).len();
        self.viewport.clamp(len);
        let range = self.viewport.visible_range(len);
        &self.projector.projection(&self.controller).rows[range]
    }

    /// Rows to materialize, including overscan
    pub fn render_rows(&mut self) -> &[ProjectedRow] {
        let len = self.projector.projection(&self.controller).len();
        self.viewport.clamp(len);
        let range = self.viewport.render_range(len);
        &self.projector.projection(&self.controller).rows[range]
    }
}
