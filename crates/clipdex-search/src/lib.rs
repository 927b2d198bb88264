//! Search and indexing core for the clipdex video-clip catalog.
//!
//! This crate owns the searchable clip document schema, full listing past the
//! engine's page cap, fuzzy multi-field search with structured filters, and
//! the show/character facet counts used by filter UIs.
//!
//! # Features
//!
//! - `http` (default): Elasticsearch-compatible REST engine over `reqwest`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      clipdex-search                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ClipSearch (service façade, read-path degradation)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndexManager    (ensure index + mapping)                   │
//! │  DocumentWriter  (create / get / update by id)              │
//! │  ScrollWalker    (cursor paging over the whole index)       │
//! │  QueryBuilder    (fuzzy text + show/character filters)      │
//! │  FacetAggregator (distinct shows / characters with counts)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SearchEngine trait                                         │
//! │  ├── HttpEngine   (REST, feature `http`)                    │
//! │  └── MemoryEngine (in-process)                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clipdex_core::EngineConfig;
//! use clipdex_search::{ClipDocument, ClipSearch, ClipSource, MemoryEngine, SearchParams};
//!
//! # tokio_test::block_on(async {
//! let search = ClipSearch::connect(Arc::new(MemoryEngine::new()), EngineConfig::default()).await;
//!
//! let doc = ClipDocument::builder()
//!     .id("clip-1")
//!     .name("Parkour")
//!     .source(ClipSource::show("The Office"))
//!     .build();
//! search.create(&doc).await?;
//!
//! let page = search.search(&SearchParams::text("parkour")).await;
//! assert_eq!(page.total, 1);
//! # Ok::<(), clipdex_core::Error>(())
//! # });
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod document;
pub mod dsl;
pub mod engine;
pub mod facets;
pub mod index;
pub mod policy;
pub mod query;
pub mod schema;
pub mod scroll;
pub mod types;
pub mod writer;

// Re-exports
pub use catalog::{ClipSearch, Health};
pub use document::{ClipDocument, ClipDocumentBuilder, ClipSource, PartialClipDocument};
pub use engine::{EngineStats, MemoryEngine, Refresh, SearchEngine};
pub use facets::FacetAggregator;
pub use index::{IndexManager, IndexStatus};
pub use policy::OrEmpty;
pub use query::QueryBuilder;
pub use schema::ClipSchema;
pub use scroll::{Listing, ScrollWalker, WalkState};
pub use types::{FacetCount, SearchPage, SearchParams, SortBy};
pub use writer::DocumentWriter;

#[cfg(feature = "http")]
pub use engine::HttpEngine;
