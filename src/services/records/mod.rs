// Record source layer for the lazy tree
//
// The tree never reads the whole record set. It asks the fetcher for the
// children of one node at a time, and the fetcher asks a pluggable backend.

pub mod backend;
pub mod fetcher;
pub mod memory;
pub mod slow;

pub use backend::{Record, RecordBackend};
pub use fetcher::{ChildFetcher, FetchError};
pub use memory::InMemoryBackend;
pub use slow::{BackendMetrics, SlowBackend, SlowBackendConfig};
