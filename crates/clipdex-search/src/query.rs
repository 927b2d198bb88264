//! Query building.
//!
//! `QueryBuilder` composes the fuzzy multi-field text query, the structured
//! show and character filters, sort order and paging into one
//! [`SearchRequest`].
//!
//! | text | show | query |
//! |------|------|-------|
//! | set  | set  | `bool.must = [show filter, text match]` |
//! | set  | -    | text match |
//! | -    | set  | show filter |
//! | -    | -    | `match_all` |
//!
//! A character filter is added as a non-scoring `term` conjunct.

use crate::dsl::{Fuzziness, Query, SearchRequest, SortClause};
use crate::schema::{ClipSchema, SOURCE_TYPE_SHOW, fields};
use crate::types::{SearchParams, SortBy, non_blank};

/// Builder for search requests over the clip index.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    schema: ClipSchema,
}

impl QueryBuilder {
    /// Create a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the request for a paged search.
    pub fn build(&self, params: &SearchParams) -> SearchRequest {
        let mut request = SearchRequest::new(self.selection(
            non_blank(params.text.as_deref()),
            non_blank(params.show.as_deref()),
            non_blank(params.character.as_deref()),
        ));
        request.sort = vec![Self::sort(params.sort_by)];
        request.from = params.offset;
        request.size = params.limit;
        request
    }

    /// Query selecting documents for the given (already trimmed) criteria.
    pub fn selection(
        &self,
        text: Option<&str>,
        show: Option<&str>,
        character: Option<&str>,
    ) -> Query {
        let base = match (show, text) {
            (Some(show), Some(text)) => Query::Bool {
                must: vec![Self::show_filter(show), self.text_match(text)],
                filter: Vec::new(),
            },
            (Some(show), None) => Self::show_filter(show),
            (None, Some(text)) => self.text_match(text),
            (None, None) => Query::MatchAll,
        };

        match character {
            None => base,
            Some(character) => with_filter(base, Self::character_filter(character)),
        }
    }

    /// Fuzzy multi-field match of `text`, scored by the best field.
    pub fn text_match(&self, text: &str) -> Query {
        Query::MultiMatch {
            query: text.to_string(),
            fields: self
                .schema
                .full_text_fields()
                .into_iter()
                .map(|(field, boost)| (field.to_string(), boost))
                .collect(),
            fuzziness: Fuzziness::Auto,
        }
    }

    /// Show sources whose title fuzzy-matches `title`.
    pub fn show_filter(title: &str) -> Query {
        Query::Bool {
            must: vec![Query::Match {
                field: fields::SOURCE_TITLE.to_string(),
                query: title.to_string(),
                fuzziness: Fuzziness::Auto,
            }],
            filter: vec![Query::term(fields::SOURCE_TYPE, SOURCE_TYPE_SHOW)],
        }
    }

    /// Documents featuring exactly `name`.
    pub fn character_filter(name: &str) -> Query {
        Query::term(fields::CHARACTERS, name)
    }

    /// Sort clause for an ordering.
    pub fn sort(sort_by: SortBy) -> SortClause {
        match sort_by {
            SortBy::Name => SortClause::asc(fields::NAME_KEYWORD),
            SortBy::CreatedAt => SortClause::desc(fields::CREATED_AT),
        }
    }
}

/// Add a non-scoring conjunct to `query`.
fn with_filter(query: Query, clause: Query) -> Query {
    match query {
        Query::MatchAll => Query::Bool {
            must: Vec::new(),
            filter: vec![clause],
        },
        Query::Bool { must, mut filter } => {
            filter.push(clause);
            Query::Bool { must, filter }
        }
        other => Query::Bool {
            must: vec![other],
            filter: vec![clause],
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
