//! Lazily loaded tree
//!
//! Nodes are discovered level by level as the user expands them. The store
//! holds structure and load state, the controller owns the expansion set and
//! drives fetches, and the projector flattens both into render rows.

pub mod expansion;
pub mod node;
pub mod outline;
pub mod projector;
pub mod store;
pub mod view;
pub mod viewport;

pub use expansion::{ExpandOutcome, ExpansionController, FetchCompletion};
pub use node::{LoadState, NodeId, TreeNode};
pub use outline::render_outline;
pub use projector::{ProjectedRow, Projection, RowKind, TreeProjector};
pub use store::{TreeError, TreeNodeStore};
pub use view::{OpenError, TreeView};
pub use viewport::Viewport;
