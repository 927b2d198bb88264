//! clipdex CLI
//!
//! Command-line access to the clip catalog index: provisioning, document
//! writes, full listings, search and facets.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod cli;
mod handlers;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use clipdex_core::EngineConfig;
use clipdex_search::ClipSearch;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,clipdex=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    if let Command::Config = args.command {
        return handlers::cmd_config(&config);
    }

    tracing::debug!(index = %config.index, url = %config.base_url(), "connecting");
    let search = ClipSearch::connect_http(config)
        .await
        .context("connecting to search engine")?;

    handlers::handle_command(&search, args.command).await
}

/// Defaults, then the optional TOML file, then environment overrides.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let base = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Ok(base.with_env_overrides(|key| std::env::var(key).ok())?)
}
