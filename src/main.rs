//! CLI entry point for the catalog aggregator.

use std::sync::Arc;

use aggregator_core::{HttpFetcher, build_registry_with};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;
mod config_runtime;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let file_config = app_config::load_default_file_config()?;
    let settings = config_runtime::resolve_settings(&args, file_config.as_ref());

    // Priority: RUST_LOG env var > quiet flag > verbose flags > config verbosity > info
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.default_level));

    // stdout carries JSON records only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    debug!(?settings, config_loaded = file_config.is_some(), "settings resolved");
    info!("Aggregator starting");

    let fetcher = HttpFetcher::with_settings(settings.fetcher)
        .context("Failed to build HTTP client")?;
    let registry = build_registry_with(Arc::new(fetcher), &settings.agents);

    match &args.command {
        Command::Agents => commands::run_agents_command(&registry),
        Command::Search {
            query,
            agent,
            page,
            offset,
        } => {
            commands::run_search_command(&registry, query, agent.as_deref(), *offset, *page).await
        }
        Command::Item { id, agent } => {
            commands::run_item_command(&registry, id, agent.as_deref()).await
        }
        Command::Chapters {
            id,
            agent,
            lang,
            page,
            offset,
        } => {
            commands::run_chapters_command(
                &registry,
                id,
                agent.as_deref(),
                lang.as_deref(),
                *offset,
                *page,
            )
            .await
        }
        Command::Pages { chapter, agent } => {
            commands::run_pages_command(&registry, chapter, agent.as_deref()).await
        }
    }
}
