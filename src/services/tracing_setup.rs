//! Tracing subscriber setup
//!
//! Shared by the binary and by tests that want to look at what the tree
//! engine logged.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "lazytree=debug";

/// Install the global subscriber, logging to a file or to stderr
///
/// Returns an error if the log file cannot be created. Installing twice is
/// not an error; the first subscriber wins.
pub fn init_global(log_file_path: Option<&Path>) -> std::io::Result<()> {
    let log_file = log_file_path.map(File::create).transpose()?;
    let _ = build_subscriber(log_file).try_init();
    Ok(())
}

/// Build a subscriber with an env filter and a formatting layer
///
/// Logs go to `log_file` when given, otherwise to stderr so they never mix
/// with rendered output on stdout.
pub fn build_subscriber(log_file: Option<File>) -> impl tracing::Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let writer = match log_file {
        Some(file) => BoxMakeWriter::new(Arc::new(file)),
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
