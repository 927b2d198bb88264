//! Typed search-engine request and response model.
//!
//! Queries are built as [`Query`] values and rendered to the engine's JSON
//! query DSL in exactly one place ([`SearchRequest::to_json`]). Both engine
//! implementations consume the same typed values.

use std::collections::BTreeMap;

use clipdex_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Edit-distance tolerance for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fuzziness {
    /// Scale with term length: 0 edits up to 2 chars, 1 up to 5, else 2.
    #[default]
    Auto,
    /// A fixed number of edits.
    Distance(u8),
}

impl Fuzziness {
    /// Maximum edits allowed for a term of `len` characters.
    pub fn max_edits(self, len: usize) -> usize {
        match self {
            Fuzziness::Auto => match len {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
            Fuzziness::Distance(d) => usize::from(d),
        }
    }

    fn to_json(self) -> Value {
        match self {
            Fuzziness::Auto => json!("AUTO"),
            Fuzziness::Distance(d) => json!(d),
        }
    }
}

/// A query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every document.
    MatchAll,
    /// Fuzzy text match on one field.
    Match {
        /// Field path.
        field: String,
        /// Query text.
        query: String,
        /// Edit tolerance.
        fuzziness: Fuzziness,
    },
    /// Fuzzy text match across weighted fields, scored by the best field.
    MultiMatch {
        /// Query text.
        query: String,
        /// Field paths with boosts.
        fields: Vec<(String, f32)>,
        /// Edit tolerance.
        fuzziness: Fuzziness,
    },
    /// Exact value on a keyword field.
    Term {
        /// Field path.
        field: String,
        /// Exact value.
        value: String,
    },
    /// Conjunction of scored (`must`) and unscored (`filter`) clauses.
    Bool {
        /// Clauses that must match and contribute to the score.
        must: Vec<Query>,
        /// Clauses that must match without scoring.
        filter: Vec<Query>,
    },
}

impl Query {
    /// Exact term clause.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Render as engine DSL.
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match {
                field,
                query,
                fuzziness,
            } => json!({
                "match": {
                    field.as_str(): {
                        "query": query,
                        "fuzziness": fuzziness.to_json(),
                    }
                }
            }),
            Query::MultiMatch {
                query,
                fields,
                fuzziness,
            } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(field, boost)| boosted_field(field, *boost))
                    .collect();
                json!({
                    "multi_match": {
                        "query": query,
                        "fields": fields,
                        "type": "best_fields",
                        "fuzziness": fuzziness.to_json(),
                    }
                })
            }
            Query::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Query::Bool { must, filter } => {
                let mut body = Map::new();
                if !must.is_empty() {
                    body.insert(
                        "must".to_string(),
                        Value::Array(must.iter().map(Query::to_json).collect()),
                    );
                }
                if !filter.is_empty() {
                    body.insert(
                        "filter".to_string(),
                        Value::Array(filter.iter().map(Query::to_json).collect()),
                    );
                }
                json!({ "bool": body })
            }
        }
    }
}

/// `name^2` style field reference; boost 1 is left implicit.
fn boosted_field(field: &str, boost: f32) -> String {
    if (boost - 1.0).abs() < f32::EPSILON {
        field.to_string()
    } else {
        format!("{field}^{boost}")
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    /// Field path (keyword or numeric/date field).
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortClause {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    fn to_json(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.order.as_str() } })
    }
}

/// Distinct-value counts over a keyword field, ordered by key ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsAggregation {
    /// Aggregation name, echoed in the response.
    pub name: String,
    /// Keyword field path.
    pub field: String,
    /// Maximum number of buckets.
    pub size: usize,
}

impl TermsAggregation {
    fn to_json(&self) -> Value {
        json!({
            "terms": {
                "field": self.field,
                "size": self.size,
                "order": { "_key": "asc" },
            }
        })
    }
}

/// A complete search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query clause.
    pub query: Query,
    /// Sort keys; empty means by relevance.
    pub sort: Vec<SortClause>,
    /// Number of hits to skip.
    pub from: usize,
    /// Number of hits to return.
    pub size: usize,
    /// Terms aggregations to compute.
    pub aggregations: Vec<TermsAggregation>,
}

impl SearchRequest {
    /// A request for `query` with default paging.
    pub fn new(query: Query) -> Self {
        Self {
            query,
            sort: Vec::new(),
            from: 0,
            size: 10,
            aggregations: Vec::new(),
        }
    }

    /// Render as an engine `_search` body.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_json());
        if !self.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort.iter().map(SortClause::to_json).collect()),
            );
        }
        if self.from > 0 {
            body.insert("from".to_string(), json!(self.from));
        }
        body.insert("size".to_string(), json!(self.size));
        body.insert("track_total_hits".to_string(), json!(true));
        if !self.aggregations.is_empty() {
            let aggs: Map<String, Value> = self
                .aggregations
                .iter()
                .map(|agg| (agg.name.clone(), agg.to_json()))
                .collect();
            body.insert("aggs".to_string(), Value::Object(aggs));
        }
        Value::Object(body)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A matched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Document id.
    pub id: String,
    /// Relevance score, absent when sorted by field.
    pub score: Option<f64>,
    /// Stored document body.
    pub source: Value,
}

/// One distinct value and its document count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Distinct value.
    pub key: String,
    /// Number of documents carrying it.
    pub doc_count: u64,
}

/// Result of a search or a scroll page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Size of the full matched set.
    pub total: u64,
    /// Hits in this page.
    pub hits: Vec<Hit>,
    /// Buckets per aggregation name.
    pub aggregations: BTreeMap<String, Vec<Bucket>>,
    /// Cursor id when the request opened or continued a scroll.
    pub scroll_id: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: RawHits,
    #[serde(default)]
    aggregations: BTreeMap<String, RawAggregation>,
}

#[derive(Deserialize)]
struct RawHits {
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Deserialize)]
struct RawAggregation {
    #[serde(default)]
    buckets: Vec<RawBucket>,
}

#[derive(Deserialize)]
struct RawBucket {
    key: Value,
    key_as_string: Option<String>,
    doc_count: u64,
}

impl SearchResponse {
    /// Parse an engine `_search` / `_search/scroll` response body.
    pub fn from_json(body: Value) -> Result<Self> {
        let raw: RawResponse = serde_json::from_value(body)?;
        let hits: Vec<Hit> = raw
            .hits
            .hits
            .into_iter()
            .map(|h| Hit {
                id: h.id,
                score: h.score,
                source: h.source,
            })
            .collect();
        let total = match raw.hits.total {
            Some(RawTotal::Count(n)) | Some(RawTotal::Object { value: n }) => n,
            None => hits.len() as u64,
        };
        let aggregations = raw
            .aggregations
            .into_iter()
            .map(|(name, agg)| {
                let buckets = agg
                    .buckets
                    .into_iter()
                    .map(|b| Bucket {
                        key: b.key_as_string.unwrap_or_else(|| match b.key {
                            Value::String(s) => s,
                            other => other.to_string(),
                        }),
                        doc_count: b.doc_count,
                    })
                    .collect();
                (name, buckets)
            })
            .collect();

        Ok(Self {
            total,
            hits,
            aggregations,
            scroll_id: raw.scroll_id,
        })
    }

    /// Buckets of the named aggregation.
    pub fn buckets(&self, name: &str) -> Result<&[Bucket]> {
        self.aggregations
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::engine(200, format!("aggregation '{name}' missing from response")))
    }
}

// ============================================================================
// Tests
// ============================================================================
