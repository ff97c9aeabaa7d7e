use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "omni-capability")]
#[command(about = "Hybrid capability search over a JSON capability registry.")]
pub(crate) struct Cli {
    /// Override config directory (user settings live under `omni-dev-fusion/capability.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Path to the capability registry export (JSON array or `{"capabilities": [...]}`).
    #[arg(long, global = true, default_value = "capabilities.json")]
    pub(crate) registry: PathBuf,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum SearchMode {
    /// Six-strategy linear fusion (diversity on by default)
    Hybrid,
    /// BM25 + embedding RRF over the whole registry
    Progressive,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Rank capabilities for a query and print JSON hits.
    Search {
        /// Free-text query
        query: String,

        /// Max results (default: settings `search.default_limit`)
        #[arg(long)]
        limit: Option<usize>,

        /// Retrieval path
        #[arg(long, value_enum, default_value_t = SearchMode::Hybrid)]
        mode: SearchMode,

        /// Disable the per-category cap
        #[arg(long, conflicts_with = "diversity")]
        no_diversity: bool,

        /// Force the per-category cap (progressive mode defaults to off)
        #[arg(long)]
        diversity: bool,

        /// Restrict hybrid search to these ids (repeatable)
        #[arg(long = "candidate")]
        candidates: Vec<String>,
    },
    /// List category labels.
    Categories,
    /// Print one capability as JSON.
    Show {
        /// Capability id or name
        id: String,
    },
}
