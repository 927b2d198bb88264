//! The clip search service.
//!
//! [`ClipSearch`] wires the index manager, writer, scroll walker, query
//! builder and facet aggregator to one engine and index. Construction never
//! fails on an unreachable engine: the service starts degraded, reads return
//! empty results, and writes fail with typed errors until the engine is back.

use std::sync::Arc;

use clipdex_core::{EngineConfig, Result, ServiceHandle, ServiceState};
use serde::Serialize;

use crate::document::{ClipDocument, PartialClipDocument};
#[cfg(feature = "http")]
use crate::engine::HttpEngine;
use crate::engine::SearchEngine;
use crate::facets::FacetAggregator;
use crate::index::{IndexManager, IndexStatus};
use crate::policy::OrEmpty;
use crate::query::QueryBuilder;
use crate::scroll::{Listing, ScrollWalker};
use crate::types::{FacetCount, SearchPage, SearchParams};
use crate::writer::DocumentWriter;

/// Service name used for the lifecycle handle.
pub const SERVICE_NAME: &str = "clip-search";

/// Snapshot of service and engine health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    /// Engine implementation name.
    pub engine: String,
    /// Index the service operates on.
    pub index: String,
    /// Lifecycle state (`ready`, `degraded: ...`).
    pub state: String,
    /// Whether the engine answered a ping.
    pub reachable: bool,
    /// Ping failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Search and indexing over the clip catalog.
#[derive(Clone)]
pub struct ClipSearch {
    engine: Arc<dyn SearchEngine>,
    config: EngineConfig,
    handle: ServiceHandle,
    index: IndexManager,
    writer: DocumentWriter,
    facets: FacetAggregator,
    queries: QueryBuilder,
}

impl ClipSearch {
    /// Build the service without touching the engine.
    ///
    /// The lifecycle state stays `Stopped` until [`ClipSearch::start`].
    pub fn new(engine: Arc<dyn SearchEngine>, config: EngineConfig) -> Self {
        let index = IndexManager::new(Arc::clone(&engine), config.index.clone());
        let writer = DocumentWriter::new(Arc::clone(&engine), config.index.clone());
        let facets = FacetAggregator::new(
            Arc::clone(&engine),
            config.index.clone(),
            config.facet_size,
        );
        Self {
            engine,
            config,
            handle: ServiceHandle::new(SERVICE_NAME),
            index,
            writer,
            facets,
            queries: QueryBuilder::new(),
        }
    }

    /// Build the service and provision the index.
    pub async fn connect(engine: Arc<dyn SearchEngine>, config: EngineConfig) -> Self {
        let service = Self::new(engine, config);
        service.start().await;
        service
    }

    /// Connect to the REST engine described by `config`.
    ///
    /// Fails only on invalid configuration.
    #[cfg(feature = "http")]
    pub async fn connect_http(config: EngineConfig) -> Result<Self> {
        let engine = HttpEngine::new(&config)?;
        log::info!("Using search engine at {}", engine.base_url());
        Ok(Self::connect(Arc::new(engine), config).await)
    }

    /// Provision the index and record the resulting state.
    pub async fn start(&self) -> IndexStatus {
        self.handle.mark_starting();
        let status = self.index.ensure_index().await;
        match &status {
            IndexStatus::Degraded(reason) => self.handle.mark_degraded(reason.clone()),
            _ => self.handle.mark_ready(),
        }
        status
    }

    /// Lifecycle handle.
    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.handle.state()
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index manager, for explicit re-provisioning.
    pub fn index_manager(&self) -> &IndexManager {
        &self.index
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Index a new document.
    pub async fn create(&self, doc: &ClipDocument) -> Result<()> {
        self.writer.create(doc).await
    }

    /// Fetch a document by id.
    pub async fn get(&self, id: &str) -> Result<ClipDocument> {
        self.writer.get(id).await
    }

    /// Merge the supplied fields into a stored document.
    pub async fn update(&self, id: &str, partial: &PartialClipDocument) -> Result<()> {
        self.writer.update(id, partial).await
    }

    // ------------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------------

    /// A walker over every document, newest first.
    pub fn walker(&self) -> ScrollWalker {
        ScrollWalker::new(
            Arc::clone(&self.engine),
            self.config.index.clone(),
            self.config.page_size,
            self.config.scroll_keep_alive(),
        )
    }

    /// Every document, with any mid-walk failure alongside the partial result.
    pub async fn walk_all(&self) -> Listing {
        self.walker().collect_all().await
    }

    /// Every document, newest first; empty if the walk failed.
    pub async fn list_all(&self) -> Vec<ClipDocument> {
        self.walk_all().await.into_result().or_empty("list_all")
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// One page of matching documents plus the total match count.
    pub async fn try_search(&self, params: &SearchParams) -> Result<SearchPage> {
        let request = self.queries.build(params);
        log::debug!("Search request: {}", request.to_json());
        let response = self.engine.search(&self.config.index, &request).await?;
        let items = response
            .hits
            .into_iter()
            .map(|hit| ClipDocument::from_source(hit.source))
            .collect::<Result<Vec<_>>>()?;
        Ok(SearchPage {
            items,
            total: response.total,
        })
    }

    /// Like [`ClipSearch::try_search`], but empty on failure.
    pub async fn search(&self, params: &SearchParams) -> SearchPage {
        self.try_search(params).await.or_empty("search")
    }

    // ------------------------------------------------------------------------
    // Facets
    // ------------------------------------------------------------------------

    /// Distinct show titles with counts, optionally scoped to a character.
    pub async fn try_available_shows(&self, character: Option<&str>) -> Result<Vec<FacetCount>> {
        self.facets.available_shows(character).await
    }

    /// Like [`ClipSearch::try_available_shows`], but empty on failure.
    pub async fn available_shows(&self, character: Option<&str>) -> Vec<FacetCount> {
        self.try_available_shows(character)
            .await
            .or_empty("available_shows")
    }

    /// Distinct characters with counts, optionally scoped to a show.
    pub async fn try_available_characters(&self, show: Option<&str>) -> Result<Vec<FacetCount>> {
        self.facets.available_characters(show).await
    }

    /// Like [`ClipSearch::try_available_characters`], but empty on failure.
    pub async fn available_characters(&self, show: Option<&str>) -> Vec<FacetCount> {
        self.try_available_characters(show)
            .await
            .or_empty("available_characters")
    }

    // ------------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------------

    /// Lifecycle state plus a live engine ping.
    pub async fn health(&self) -> Health {
        let ping = self.engine.ping().await;
        Health {
            engine: self.engine.name().to_string(),
            index: self.config.index.clone(),
            state: self.state().to_string(),
            reachable: ping.is_ok(),
            error: ping.err().map(|e| e.to_string()),
        }
    }
}

impl std::fmt::Debug for ClipSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipSearch")
            .field("engine", &self.engine.name())
            .field("index", &self.config.index)
            .field("state", &self.state())
            .finish()
    }
}
