use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use lazytree::config::TreeConfig;
use lazytree::services::records::{ChildFetcher, InMemoryBackend, RecordBackend, SlowBackend};
use lazytree::services::tracing_setup;
use lazytree::view::tree::{render_outline, NodeId, TreeView};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lazytree")]
#[command(about = "Browse a parent/child record set as a lazily loaded tree", long_about = None)]
#[command(version)]
struct Args {
    /// JSON file holding an array of {id, parent_id, label} records
    #[arg(value_name = "RECORDS")]
    records: PathBuf,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Expand a node (repeatable, applied in order, each waits for its fetch)
    #[arg(long = "expand", value_name = "ID")]
    expand: Vec<u64>,

    /// Expand every loaded node after the individual expansions
    #[arg(long)]
    expand_all: bool,

    /// Collapse everything before printing
    #[arg(long)]
    collapse_all: bool,

    /// Scroll the viewport down by this many rows before printing
    #[arg(long, value_name = "ROWS", default_value_t = 0)]
    scroll: usize,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn load_config(args: &Args) -> AnyhowResult<TreeConfig> {
    match &args.config {
        Some(path) => TreeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(TreeConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let config = load_config(&args)?;

    if args.dump_config {
        let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(());
    }

    tracing_setup::init_global(args.log_file.as_deref()).context("Failed to open log file")?;

    let records = InMemoryBackend::load_from_file(&args.records)
        .with_context(|| format!("Failed to read records from {}", args.records.display()))?;
    tracing::info!(records = records.len(), "loaded record set");

    let backend: Arc<dyn RecordBackend> = if config.fetch.is_instant() {
        Arc::new(records)
    } else {
        Arc::new(SlowBackend::new(
            Arc::new(records),
            config.fetch.to_backend_config(),
        ))
    };

    let mut view = TreeView::open(
        ChildFetcher::new(backend),
        &config,
        tokio::runtime::Handle::current(),
    )
    .await?;

    for id in &args.expand {
        let id = NodeId(*id);
        view.expand(id)
            .with_context(|| format!("Cannot expand {}", id))?;
        view.settle().await;
    }

    if args.expand_all {
        view.expand_all();
        view.settle().await;
    }

    if args.collapse_all {
        view.collapse_all();
    }

    let scroll = isize::try_from(args.scroll).unwrap_or(isize::MAX);
    view.scroll_by(scroll);

    let outline = render_outline(view.visible_rows());
    if !outline.is_empty() {
        println!("{}", outline);
    }

    Ok(())
}
