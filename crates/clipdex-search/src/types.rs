//! Request and result types for the search API.

use std::fmt;
use std::str::FromStr;

use clipdex_core::Error;
use serde::{Deserialize, Serialize};

use crate::document::ClipDocument;

/// Default page size for [`SearchParams`].
pub const DEFAULT_LIMIT: usize = 20;

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    /// Newest `createdAt` first.
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    /// Alphabetical by exact name, ascending.
    #[serde(rename = "name")]
    Name,
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::CreatedAt => write!(f, "createdAt"),
            SortBy::Name => write!(f, "name"),
        }
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created-at" | "created_at" => Ok(SortBy::CreatedAt),
            "name" => Ok(SortBy::Name),
            other => Err(Error::validation(
                "sortBy",
                format!("unknown sort order '{other}'"),
            )),
        }
    }
}

/// Parameters for a paged search.
///
/// Blank `text`, `show` and `character` values are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Free text matched across name, description, script, characters, tags.
    #[serde(default)]
    pub text: Option<String>,
    /// Show title, fuzzy matched against show sources only.
    #[serde(default, rename = "showFilter")]
    pub show: Option<String>,
    /// Exact character name.
    #[serde(default, rename = "characterFilter")]
    pub character: Option<String>,
    /// Number of hits to skip.
    #[serde(default)]
    pub offset: usize,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Result ordering.
    #[serde(default)]
    pub sort_by: SortBy,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            text: None,
            show: None,
            character: None,
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort_by: SortBy::default(),
        }
    }
}

impl SearchParams {
    /// Search for `text` with default paging.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Restrict to a show.
    pub fn with_show(mut self, show: impl Into<String>) -> Self {
        self.show = Some(show.into());
        self
    }

    /// Restrict to a character.
    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    /// Set the page window.
    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Set the ordering.
    pub fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Documents in this page.
    pub items: Vec<ClipDocument>,
    /// Size of the full matched set.
    pub total: u64,
}

impl SearchPage {
    /// Returns `true` if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.total == 0 && self.items.is_empty()
    }
}

/// A distinct facet value and the number of documents carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    /// Facet value (show title or character name).
    pub name: String,
    /// Number of matching documents.
    pub count: u64,
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
