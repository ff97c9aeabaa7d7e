//! omni-capability CLI: search, categories, or show.
//!
//! Reads the registry from `--registry <path>` (default `capabilities.json`).
//! Settings come from `packages/conf/capability.yaml` merged with the user
//! file under `--conf` / `PRJ_CONFIG_HOME`.
//!
//! Logging: set `RUST_LOG=omni_capability=debug` to see ranking events on stderr.

mod cli;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_capability::{
    CapabilitySearchEngine, JsonFileRegistrySource, SearchOptions, load_search_settings,
};

use crate::cli::{Cli, Command, SearchMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("omni_capability=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = load_search_settings(cli.conf.as_deref()).resolve();
    let engine = CapabilitySearchEngine::from_settings(settings);
    let source = JsonFileRegistrySource::new(&cli.registry);
    engine
        .refresh(&source)
        .await
        .with_context(|| format!("failed to load registry {}", cli.registry.display()))?;

    match cli.command {
        Command::Search {
            query,
            limit,
            mode,
            no_diversity,
            diversity,
            candidates,
        } => {
            let mut options = SearchOptions {
                limit,
                ..SearchOptions::default()
            };
            if matches!(mode, SearchMode::Progressive) {
                options = options.full_registry();
            }
            if no_diversity {
                options = options.with_diversity(false);
            } else if diversity {
                options = options.with_diversity(true);
            }
            if !candidates.is_empty() {
                options = options.with_candidates(candidates);
            }
            let hits = engine.search(&query, &options).await;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Categories => {
            let snapshot = engine.snapshot().await;
            for category in snapshot.registry().categories() {
                println!("{category}");
            }
        }
        Command::Show { id } => {
            let snapshot = engine.snapshot().await;
            let entry = snapshot
                .registry()
                .resolve(&id)
                .with_context(|| format!("unknown capability: {id}"))?;
            println!("{}", serde_json::to_string_pretty(entry.as_ref())?);
        }
    }
    Ok(())
}
