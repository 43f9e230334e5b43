//! Asynchronous services
//!
//! Data access for the tree and process-wide setup such as logging.

pub mod records;
pub mod tracing_setup;
