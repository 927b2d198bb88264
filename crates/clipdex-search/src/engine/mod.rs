//! Search engine trait and implementations.
//!
//! This module defines the `SearchEngine` trait covering the upstream
//! primitives the search core relies on: index creation, single-document
//! get/index/update by id, query search, and scroll cursors.
//!
//! # Engines
//!
//! - `HttpEngine`: Elasticsearch-compatible REST client (requires `http` feature)
//! - `MemoryEngine`: In-process engine for tests and local runs

use std::time::Duration;

use async_trait::async_trait;
use clipdex_core::Result;
use serde_json::Value;

use crate::dsl::{SearchRequest, SearchResponse};

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

#[cfg(feature = "http")]
pub use http::HttpEngine;
pub use memory::{EngineStats, MemoryEngine};

/// When a write becomes visible to searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Refresh the affected shards before returning.
    #[default]
    Immediate,
    /// Return once a scheduled refresh has made the write visible.
    WaitFor,
    /// Do not wait for visibility.
    None,
}

impl Refresh {
    /// Value of the `refresh` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Refresh::Immediate => "true",
            Refresh::WaitFor => "wait_for",
            Refresh::None => "false",
        }
    }
}

/// Abstract search engine.
///
/// Every method is a single request/response exchange; implementations hold
/// no locks across calls apart from server-side scroll cursors.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Engine name for diagnostics.
    fn name(&self) -> &str;

    /// Check that the engine is reachable.
    async fn ping(&self) -> Result<()>;

    /// Whether `index` exists.
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create `index` with the given settings/mappings body.
    ///
    /// Returns `false` if the index already existed.
    async fn create_index(&self, index: &str, body: &Value) -> Result<bool>;

    /// Store `source` under `id`, replacing any existing document.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        refresh: Refresh,
    ) -> Result<()>;

    /// Fetch the stored body of `id`, or `None` if absent.
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>>;

    /// Replace the top-level keys present in `fields`, leaving others untouched.
    ///
    /// Fails with `NotFound` if `id` does not exist.
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        fields: &Value,
        refresh: Refresh,
    ) -> Result<()>;

    /// Execute a search.
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse>;

    /// Run `request` and open a scroll cursor over its results.
    ///
    /// Returns the first page (of `request.size` hits) and the cursor id.
    async fn open_scroll(
        &self,
        index: &str,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> Result<SearchResponse>;

    /// Fetch the next page of an open cursor, extending its lifetime.
    async fn continue_scroll(&self, scroll_id: &str, keep_alive: Duration)
    -> Result<SearchResponse>;

    /// Release a cursor.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<()>;
}

/// Keep-alive in the engine's duration syntax (`300s`).
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn keep_alive_param(keep_alive: Duration) -> String {
    format!("{}s", keep_alive.as_secs().max(1))
}
