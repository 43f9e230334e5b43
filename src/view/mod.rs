//! View layer
//!
//! Presentation state: what is expanded, which rows are visible.

pub mod tree;
