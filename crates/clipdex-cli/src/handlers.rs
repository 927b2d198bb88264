//! Handler functions for `clipdex` subcommands.
//!
//! Each `cmd_*` function runs one subcommand against a connected
//! [`ClipSearch`] and prints JSON to stdout.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clipdex_core::EngineConfig;
use clipdex_search::{ClipDocument, ClipSearch, PartialClipDocument, SearchParams};
use serde::Serialize;
use serde_json::Value;

use crate::cli::Command;

// ============================================================================
// Dispatch
// ============================================================================

/// Run `command` against `search`.
pub async fn handle_command(search: &ClipSearch, command: Command) -> Result<()> {
    match command {
        Command::Init => cmd_init(search).await,
        Command::Health => cmd_health(search).await,
        Command::Config => cmd_config(search.config()),
        Command::Get { id } => cmd_get(search, &id).await,
        Command::Create { file } => cmd_create(search, &file).await,
        Command::Update { id, file, by } => cmd_update(search, &id, &file, by).await,
        Command::List { strict } => cmd_list(search, strict).await,
        Command::Search {
            text,
            show,
            character,
            sort,
            offset,
            limit,
        } => {
            let params = SearchParams {
                text,
                show,
                character,
                offset,
                limit,
                sort_by: sort,
            };
            cmd_search(search, &params).await
        }
        Command::Shows { character } => cmd_shows(search, character.as_deref()).await,
        Command::Characters { show } => cmd_characters(search, show.as_deref()).await,
    }
}

// ============================================================================
// Command handlers
// ============================================================================

/// Provision the index.
pub async fn cmd_init(search: &ClipSearch) -> Result<()> {
    let index = search.index_manager();
    let status = index
        .try_ensure_index()
        .await
        .with_context(|| format!("provisioning index '{}'", index.index()))?;
    tracing::info!(index = index.index(), %status, "index ready");
    print_json(&serde_json::json!({ "index": index.index(), "status": status.to_string() }))
}

/// Print engine health.
pub async fn cmd_health(search: &ClipSearch) -> Result<()> {
    let health = search.health().await;
    print_json(&health)?;
    if !health.reachable {
        bail!("engine unreachable");
    }
    Ok(())
}

/// Print the effective configuration.
pub fn cmd_config(config: &EngineConfig) -> Result<()> {
    print_json(&redacted(config))
}

/// Print one clip.
pub async fn cmd_get(search: &ClipSearch, id: &str) -> Result<()> {
    let doc = search.get(id).await?;
    print_json(&doc)
}

/// Index a clip read from `file`.
pub async fn cmd_create(search: &ClipSearch, file: &Path) -> Result<()> {
    let doc = parse_new_clip(read_json(file)?)?;
    search
        .create(&doc)
        .await
        .with_context(|| format!("creating clip '{}'", doc.id))?;
    tracing::info!(id = %doc.id, "clip created");
    print_json(&doc)
}

/// Apply a partial update read from `file`.
pub async fn cmd_update(
    search: &ClipSearch,
    id: &str,
    file: &Path,
    by: Option<String>,
) -> Result<()> {
    let mut partial: PartialClipDocument =
        serde_json::from_value(read_json(file)?).context("parsing partial clip")?;
    if by.is_some() {
        partial.updated_by = by;
    }
    if partial.is_empty() {
        bail!("update for '{id}' names no fields");
    }
    search
        .update(id, &partial)
        .await
        .with_context(|| format!("updating clip '{id}'"))?;
    let doc = search.get(id).await?;
    print_json(&doc)
}

/// Print every clip, newest first.
pub async fn cmd_list(search: &ClipSearch, strict: bool) -> Result<()> {
    let docs = if strict {
        search.walk_all().await.into_result()?
    } else {
        search.list_all().await
    };
    tracing::debug!(count = docs.len(), "listing complete");
    print_json(&docs)
}

/// Print one page of search results.
pub async fn cmd_search(search: &ClipSearch, params: &SearchParams) -> Result<()> {
    let page = search.search(params).await;
    print_json(&page)
}

/// Print the show facet.
pub async fn cmd_shows(search: &ClipSearch, character: Option<&str>) -> Result<()> {
    print_json(&search.available_shows(character).await)
}

/// Print the character facet.
pub async fn cmd_characters(search: &ClipSearch, show: Option<&str>) -> Result<()> {
    print_json(&search.available_characters(show).await)
}

// ============================================================================
// Helpers
// ============================================================================

/// Read a JSON value from `path`, or stdin when `path` is `-`.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Build a new clip from user JSON, assigning an id and creation time when absent.
pub fn parse_new_clip(mut value: Value) -> Result<ClipDocument> {
    let Some(fields) = value.as_object_mut() else {
        bail!("clip must be a JSON object");
    };
    let has_id = fields
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.trim().is_empty());
    if !has_id {
        fields.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
    }
    if !fields.contains_key("createdAt") {
        fields.insert("createdAt".into(), serde_json::to_value(Utc::now())?);
    }
    fields
        .entry("ownerId")
        .or_insert_with(|| Value::String(String::new()));
    serde_json::from_value(value).context("parsing clip")
}

fn redacted(config: &EngineConfig) -> EngineConfig {
    let mut shown = config.clone();
    if shown.password.is_some() {
        shown.password = Some("********".to_string());
    }
    shown
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
