//! In-process search engine.
//!
//! Evaluates the same typed [`Query`] values the REST engine sends, with
//! enough fidelity to exercise the search core without a server:
//!
//! - Keyword fields compare whole values; text fields are lowercased and
//!   split on non-alphanumerics.
//! - Fuzzy clauses accept a term within `Fuzziness::max_edits` of a stored
//!   token (optimal string alignment distance).
//! - Scores are the number of matched query terms, times the field boost
//!   for multi-match. Exact scores are not comparable with a real engine.
//!
//! Fault injection hooks let tests simulate outages and cursor failures.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use clipdex_core::{Error, Result};
use serde_json::Value;

use super::{Refresh, SearchEngine};
use crate::dsl::{
    Bucket, Fuzziness, Hit, Query, SearchRequest, SearchResponse, SortClause, SortOrder,
    TermsAggregation,
};

/// Keyword values longer than this are not aggregated (`ignore_above`).
const IGNORE_ABOVE: usize = 256;

/// Request counters, for asserting how the core used the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// `search` calls served.
    pub searches: u64,
    /// Scroll cursors opened.
    pub scroll_opens: u64,
    /// Scroll continuation pages served.
    pub scroll_pages: u64,
    /// Scroll cursors released.
    pub scroll_clears: u64,
    /// Documents indexed or updated.
    pub writes: u64,
    /// Cursors currently open.
    pub live_scrolls: usize,
}

struct MemoryIndex {
    mapping: Value,
    docs: Vec<(String, Value)>,
}

struct Cursor {
    hits: Vec<Hit>,
    total: u64,
    offset: usize,
    page_size: usize,
    expires_at: Instant,
}

#[derive(Default)]
struct State {
    indices: HashMap<String, MemoryIndex>,
    cursors: HashMap<String, Cursor>,
    next_cursor: u64,
    stats: EngineStats,
    unavailable: bool,
    fail_scroll_after: Option<u64>,
    fail_clear_scroll: bool,
}

impl State {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            Err(Error::unavailable("memory engine is offline"))
        } else {
            Ok(())
        }
    }

    fn index(&self, index: &str) -> Result<&MemoryIndex> {
        self.indices.get(index).ok_or_else(|| {
            Error::engine(
                404,
                format!("index_not_found_exception: no such index [{index}]"),
            )
        })
    }
}

/// In-process [`SearchEngine`].
#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the request counters.
    pub fn stats(&self) -> EngineStats {
        let state = self.lock();
        EngineStats {
            live_scrolls: state.cursors.len(),
            ..state.stats
        }
    }

    /// Simulate a transport outage: every call fails with `EngineUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Fail scroll continuations once `pages` continuation pages were served.
    pub fn fail_scroll_after(&self, pages: u64) {
        self.lock().fail_scroll_after = Some(pages);
    }

    /// Make cursor release fail.
    pub fn fail_clear_scroll(&self, fail: bool) {
        self.lock().fail_clear_scroll = fail;
    }

    /// Number of documents stored in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.lock().indices.get(index).map_or(0, |idx| idx.docs.len())
    }

    /// Mappings `index` was created with (`null` for auto-created indices).
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.lock()
            .indices
            .get(index)
            .map(|idx| idx.mapping.clone())
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("stats", &self.stats())
            .finish()
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        self.lock().check_available()
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<bool> {
        let mut state = self.lock();
        state.check_available()?;
        if state.indices.contains_key(index) {
            return Ok(false);
        }
        state.indices.insert(
            index.to_string(),
            MemoryIndex {
                mapping: body["mappings"].clone(),
                docs: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
        _refresh: Refresh,
    ) -> Result<()> {
        let mut state = self.lock();
        state.check_available()?;
        if !source.is_object() {
            return Err(Error::engine(
                400,
                "mapper_parsing_exception: document must be an object",
            ));
        }
        let idx = state
            .indices
            .entry(index.to_string())
            .or_insert_with(|| MemoryIndex {
                mapping: Value::Null,
                docs: Vec::new(),
            });
        match idx.docs.iter_mut().find(|(doc_id, _)| doc_id == id) {
            Some((_, stored)) => *stored = source.clone(),
            None => idx.docs.push((id.to_string(), source.clone())),
        }
        state.stats.writes += 1;
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.indices.get(index).and_then(|idx| {
            idx.docs
                .iter()
                .find(|(doc_id, _)| doc_id == id)
                .map(|(_, source)| source.clone())
        }))
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        fields: &Value,
        _refresh: Refresh,
    ) -> Result<()> {
        let mut state = self.lock();
        state.check_available()?;
        let Value::Object(fields) = fields else {
            return Err(Error::engine(
                400,
                "illegal_argument_exception: update fields must be an object",
            ));
        };
        let stored = state
            .indices
            .get_mut(index)
            .and_then(|idx| idx.docs.iter_mut().find(|(doc_id, _)| doc_id == id))
            .map(|(_, source)| source)
            .ok_or_else(|| Error::not_found(id))?;
        if let Value::Object(existing) = stored {
            for (key, value) in fields {
                existing.insert(key.clone(), value.clone());
            }
        }
        state.stats.writes += 1;
        Ok(())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse> {
        let mut state = self.lock();
        state.check_available()?;
        let mut response = execute(state.index(index)?, request);
        response.hits = response
            .hits
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .collect();
        state.stats.searches += 1;
        Ok(response)
    }

    async fn open_scroll(
        &self,
        index: &str,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> Result<SearchResponse> {
        let mut state = self.lock();
        state.check_available()?;
        let SearchResponse {
            total,
            mut hits,
            aggregations,
            ..
        } = execute(state.index(index)?, request);
        let rest = hits.split_off(request.size.min(hits.len()));

        state.next_cursor += 1;
        let scroll_id = format!("memory-scroll-{}", state.next_cursor);
        state.cursors.insert(
            scroll_id.clone(),
            Cursor {
                hits: rest,
                total,
                offset: 0,
                page_size: request.size,
                expires_at: Instant::now() + keep_alive,
            },
        );
        state.stats.scroll_opens += 1;

        Ok(SearchResponse {
            total,
            hits,
            aggregations,
            scroll_id: Some(scroll_id),
        })
    }

    async fn continue_scroll(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<SearchResponse> {
        let mut state = self.lock();
        state.check_available()?;
        if state
            .fail_scroll_after
            .is_some_and(|limit| state.stats.scroll_pages >= limit)
        {
            return Err(Error::engine(
                500,
                "search_phase_execution_exception: all shards failed",
            ));
        }

        let now = Instant::now();
        let expired = match state.cursors.get(scroll_id) {
            None => {
                return Err(Error::scroll(format!(
                    "no search context found for id [{scroll_id}]"
                )));
            }
            Some(cursor) => now >= cursor.expires_at,
        };
        if expired {
            state.cursors.remove(scroll_id);
            return Err(Error::scroll(format!(
                "search context [{scroll_id}] expired"
            )));
        }

        let (hits, total) = match state.cursors.get_mut(scroll_id) {
            Some(cursor) => {
                let end = (cursor.offset + cursor.page_size).min(cursor.hits.len());
                let page = cursor.hits[cursor.offset..end].to_vec();
                cursor.offset = end;
                cursor.expires_at = now + keep_alive;
                (page, cursor.total)
            }
            None => (Vec::new(), 0),
        };
        state.stats.scroll_pages += 1;

        Ok(SearchResponse {
            total,
            hits,
            aggregations: BTreeMap::new(),
            scroll_id: Some(scroll_id.to_string()),
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.check_available()?;
        if state.fail_clear_scroll {
            return Err(Error::unavailable("injected clear_scroll failure"));
        }
        if state.cursors.remove(scroll_id).is_none() {
            return Err(Error::scroll("cursor already released"));
        }
        state.stats.scroll_clears += 1;
        Ok(())
    }
}

// ============================================================================
// Query evaluation
// ============================================================================

/// Match, sort and aggregate over the whole index. Hits are not paged.
fn execute(index: &MemoryIndex, request: &SearchRequest) -> SearchResponse {
    let mut matched: Vec<(&str, &Value, f64)> = index
        .docs
        .iter()
        .filter_map(|(id, source)| {
            evaluate(&request.query, &index.mapping, source).map(|score| (id.as_str(), source, score))
        })
        .collect();

    if request.sort.is_empty() {
        matched.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    } else {
        matched.sort_by(|a, b| compare_sources(&request.sort, a.1, b.1));
    }

    let aggregations = request
        .aggregations
        .iter()
        .map(|agg| {
            (
                agg.name.clone(),
                aggregate(agg, matched.iter().map(|(_, source, _)| *source)),
            )
        })
        .collect();

    let scored = request.sort.is_empty();
    SearchResponse {
        total: matched.len() as u64,
        hits: matched
            .into_iter()
            .map(|(id, source, score)| Hit {
                id: id.to_string(),
                score: scored.then_some(score),
                source: source.clone(),
            })
            .collect(),
        aggregations,
        scroll_id: None,
    }
}

/// Score of `source` against `query`, or `None` if it does not match.
fn evaluate(query: &Query, mapping: &Value, source: &Value) -> Option<f64> {
    match query {
        Query::MatchAll => Some(1.0),
        Query::Match {
            field,
            query,
            fuzziness,
        } => match_field(mapping, source, field, query, *fuzziness),
        Query::MultiMatch {
            query,
            fields,
            fuzziness,
        } => fields
            .iter()
            .filter_map(|(field, boost)| {
                match_field(mapping, source, field, query, *fuzziness)
                    .map(|score| score * f64::from(*boost))
            })
            .reduce(f64::max),
        Query::Term { field, value } => {
            let values = field_values(source, field);
            let hit = if is_keyword(mapping, field) {
                values
                    .iter()
                    .any(|v| scalar_text(v).as_deref() == Some(value.as_str()))
            } else {
                values
                    .iter()
                    .filter_map(|v| scalar_text(v))
                    .any(|text| tokenize(&text).iter().any(|token| token == value))
            };
            hit.then_some(1.0)
        }
        Query::Bool { must, filter } => {
            for clause in filter {
                evaluate(clause, mapping, source)?;
            }
            must.iter()
                .map(|clause| evaluate(clause, mapping, source))
                .sum::<Option<f64>>()
        }
    }
}

fn match_field(
    mapping: &Value,
    source: &Value,
    field: &str,
    query: &str,
    fuzziness: Fuzziness,
) -> Option<f64> {
    let values: Vec<String> = field_values(source, field)
        .into_iter()
        .filter_map(scalar_text)
        .collect();
    if values.is_empty() {
        return None;
    }

    if is_keyword(mapping, field) {
        let allowed = fuzziness.max_edits(query.chars().count());
        return values
            .iter()
            .any(|v| strsim::osa_distance(query, v) <= allowed)
            .then_some(1.0);
    }

    let stored: BTreeSet<String> = values.iter().flat_map(|v| tokenize(v)).collect();
    let matched = tokenize(query)
        .iter()
        .filter(|term| {
            let allowed = fuzziness.max_edits(term.chars().count());
            stored
                .iter()
                .any(|token| strsim::osa_distance(term, token) <= allowed)
        })
        .count();
    (matched > 0).then_some(matched as f64)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `field` is mapped as an exact-match keyword.
///
/// Unmapped fields follow dynamic mapping: strings are text, with a
/// `.keyword` sub-field.
fn is_keyword(mapping: &Value, field: &str) -> bool {
    if field.ends_with(".keyword") {
        return true;
    }
    let mut node = mapping;
    for segment in field.split('.') {
        node = &node["properties"][segment];
    }
    node["type"] == "keyword"
}

/// Values at a dotted path; arrays contribute each element.
fn field_values<'a>(source: &'a Value, field: &str) -> Vec<&'a Value> {
    let path: Vec<&str> = field
        .strip_suffix(".keyword")
        .unwrap_or(field)
        .split('.')
        .collect();
    let mut out = Vec::new();
    collect_values(source, &path, &mut out);
    out
}

fn collect_values<'a>(value: &'a Value, path: &[&str], out: &mut Vec<&'a Value>) {
    if let Value::Array(items) = value {
        for item in items {
            collect_values(item, path, out);
        }
        return;
    }
    match path.split_first() {
        None if !value.is_null() => out.push(value),
        None => {}
        Some((head, rest)) => {
            if let Some(child) = value.get(*head) {
                collect_values(child, rest, out);
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey {
    Number(f64),
    Date(DateTime<FixedOffset>),
    Text(String),
}

fn sort_key(source: &Value, field: &str) -> Option<SortKey> {
    let value = field_values(source, field).into_iter().next()?;
    match value {
        Value::Number(n) => n.as_f64().map(SortKey::Number),
        Value::String(s) => Some(
            DateTime::parse_from_rfc3339(s)
                .map(SortKey::Date)
                .unwrap_or_else(|_| SortKey::Text(s.clone())),
        ),
        Value::Bool(b) => Some(SortKey::Text(b.to_string())),
        _ => None,
    }
}

/// Missing values sort last in either direction.
fn compare_sources(sort: &[SortClause], a: &Value, b: &Value) -> Ordering {
    for clause in sort {
        let ordering = match (sort_key(a, &clause.field), sort_key(b, &clause.field)) {
            (Some(x), Some(y)) => {
                let natural = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match clause.order {
                    SortOrder::Asc => natural,
                    SortOrder::Desc => natural.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

// ============================================================================
// Aggregations
// ============================================================================

fn aggregate<'a>(agg: &TermsAggregation, sources: impl Iterator<Item = &'a Value>) -> Vec<Bucket> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for source in sources {
        let distinct: BTreeSet<String> = field_values(source, &agg.field)
            .into_iter()
            .filter_map(scalar_text)
            .filter(|key| key.chars().count() <= IGNORE_ABOVE)
            .collect();
        for key in distinct {
            *counts.entry(key).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .take(agg.size)
        .map(|(key, doc_count)| Bucket { key, doc_count })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
