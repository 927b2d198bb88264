//! Facet counts for filter UIs.
//!
//! Each facet is one size-0 search with a single terms aggregation. Counts are
//! per document: a document listing a character once is counted once.

use std::sync::Arc;

use clipdex_core::Result;

use crate::dsl::{Query, SearchRequest, TermsAggregation};
use crate::engine::SearchEngine;
use crate::query::QueryBuilder;
use crate::schema::{SOURCE_TYPE_SHOW, fields};
use crate::types::{FacetCount, non_blank};

const SHOWS: &str = "shows";
const CHARACTERS: &str = "characters";

/// Computes distinct show and character counts.
#[derive(Clone)]
pub struct FacetAggregator {
    engine: Arc<dyn SearchEngine>,
    index: String,
    size: usize,
}

impl FacetAggregator {
    /// Aggregate over `index`, returning at most `size` values per facet.
    pub fn new(engine: Arc<dyn SearchEngine>, index: impl Into<String>, size: usize) -> Self {
        Self {
            engine,
            index: index.into(),
            size,
        }
    }

    /// Distinct show titles with clip counts, alphabetically.
    ///
    /// `character` narrows the count to clips featuring that character.
    pub async fn available_shows(&self, character: Option<&str>) -> Result<Vec<FacetCount>> {
        let mut filter = vec![Query::term(fields::SOURCE_TYPE, SOURCE_TYPE_SHOW)];
        if let Some(character) = non_blank(character) {
            filter.push(QueryBuilder::character_filter(character));
        }
        let query = Query::Bool {
            must: Vec::new(),
            filter,
        };
        self.count(query, SHOWS, fields::SOURCE_TITLE_KEYWORD).await
    }

    /// Distinct characters with clip counts, alphabetically.
    ///
    /// `show` narrows the count to clips from shows fuzzy-matching that title.
    pub async fn available_characters(&self, show: Option<&str>) -> Result<Vec<FacetCount>> {
        let query = match non_blank(show) {
            Some(show) => QueryBuilder::show_filter(show),
            None => Query::MatchAll,
        };
        self.count(query, CHARACTERS, fields::CHARACTERS).await
    }

    /// Request for one facet over the documents matching `query`.
    pub fn request(&self, query: Query, name: &str, field: &str) -> SearchRequest {
        let mut request = SearchRequest::new(query);
        request.size = 0;
        request.aggregations = vec![TermsAggregation {
            name: name.to_string(),
            field: field.to_string(),
            size: self.size,
        }];
        request
    }

    async fn count(&self, query: Query, name: &str, field: &str) -> Result<Vec<FacetCount>> {
        let request = self.request(query, name, field);
        let response = self.engine.search(&self.index, &request).await?;
        let counts: Vec<FacetCount> = response
            .buckets(name)?
            .iter()
            .map(|bucket| FacetCount {
                name: bucket.key.clone(),
                count: bucket.doc_count,
            })
            .collect();
        log::debug!("Facet '{name}' returned {} value(s)", counts.len());
        Ok(counts)
    }
}

impl std::fmt::Debug for FacetAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetAggregator")
            .field("engine", &self.engine.name())
            .field("index", &self.index)
            .field("size", &self.size)
            .finish()
    }
}
