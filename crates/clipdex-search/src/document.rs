//! Clip document representation.
//!
//! [`ClipDocument`] is the searchable unit. Its JSON shape is exactly what is
//! stored in the index (camelCase keys, `source` tagged by `type`).
//!
//! ```rust
//! use clipdex_search::{ClipDocument, ClipSource};
//!
//! let doc = ClipDocument::builder()
//!     .id("clip-1")
//!     .name("Parkour!")
//!     .description("Michael, Dwight and Andy do parkour")
//!     .characters(["Michael", "Dwight", "Andy"])
//!     .source(ClipSource::show("The Office"))
//!     .build();
//!
//! assert_eq!(doc.show_title(), Some("The Office"));
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use clipdex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{SOURCE_TYPE_MOVIE, SOURCE_TYPE_SHOW};

/// A clip as indexed and searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipDocument {
    // Identity
    /// Globally unique identifier, assigned by the caller at creation.
    pub id: String,

    // Full-text fields
    /// Clip name (tokenized, plus a keyword sub-field for sorting).
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Transcript of the clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    // Ownership
    /// Owning user id (exact match).
    pub owner_id: String,
    /// Owning user email (exact match).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,

    // Storage references (opaque)
    /// Object storage key of the video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    /// Playback URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Public share page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    /// Blurhash placeholder for the thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blurhash: Option<String>,

    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    // Facet fields
    /// Characters appearing in the clip.
    #[serde(default)]
    pub characters: BTreeSet<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Show or movie the clip comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ClipSource>,

    // Audit
    /// Creation time, immutable.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Who performed the last mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Where a clip comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClipSource {
    /// An episode of a TV show.
    #[serde(rename_all = "camelCase")]
    Show {
        /// Show title.
        title: String,
        /// Original air date of the episode.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        air_date: Option<NaiveDate>,
        /// Season number.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        season: Option<u32>,
        /// Episode number within the season.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        episode: Option<u32>,
    },
    /// A feature film.
    #[serde(rename_all = "camelCase")]
    Movie {
        /// Movie title.
        title: String,
        /// Release date.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        release_date: Option<NaiveDate>,
    },
}

impl ClipSource {
    /// A show source with only a title.
    pub fn show(title: impl Into<String>) -> Self {
        ClipSource::Show {
            title: title.into(),
            air_date: None,
            season: None,
            episode: None,
        }
    }

    /// A movie source with only a title.
    pub fn movie(title: impl Into<String>) -> Self {
        ClipSource::Movie {
            title: title.into(),
            release_date: None,
        }
    }

    /// The source title.
    pub fn title(&self) -> &str {
        match self {
            ClipSource::Show { title, .. } | ClipSource::Movie { title, .. } => title,
        }
    }

    /// Value of the `source.type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ClipSource::Show { .. } => SOURCE_TYPE_SHOW,
            ClipSource::Movie { .. } => SOURCE_TYPE_MOVIE,
        }
    }

    /// A source title must be present.
    pub fn validate(&self) -> Result<()> {
        if self.title().trim().is_empty() {
            return Err(Error::validation("source.title", "must not be empty"));
        }
        Ok(())
    }
}

impl ClipDocument {
    /// Create a new document builder.
    pub fn builder() -> ClipDocumentBuilder {
        ClipDocumentBuilder::default()
    }

    /// Title of the show this clip belongs to, if any.
    pub fn show_title(&self) -> Option<&str> {
        match &self.source {
            Some(ClipSource::Show { title, .. }) => Some(title),
            _ => None,
        }
    }

    /// Boundary validation before a document is written.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("id", "must not be empty"));
        }
        if let Some(source) = &self.source {
            source.validate()?;
        }
        Ok(())
    }

    /// Encode as the JSON body stored in the index.
    pub fn to_source(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a stored JSON body.
    pub fn from_source(source: Value) -> Result<Self> {
        Ok(serde_json::from_value(source)?)
    }
}

// ============================================================================
// Partial updates
// ============================================================================

/// Fields to change on an existing document.
///
/// Only `Some` fields are written; everything else keeps its stored value.
/// `id` and `createdAt` are immutable and therefore absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialClipDocument {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// New owner id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// New owner email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    /// New storage key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    /// New playback URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// New thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// New share URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    /// New blurhash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blurhash: Option<String>,
    /// New duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Replacement character set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<BTreeSet<String>>,
    /// Replacement tag set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// Replacement source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ClipSource>,
    /// Mutation time; stamped by the writer when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Who performed the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PartialClipDocument {
    /// Returns `true` if no content field is set.
    pub fn is_empty(&self) -> bool {
        *self
            == PartialClipDocument {
                updated_at: self.updated_at,
                updated_by: self.updated_by.clone(),
                ..Default::default()
            }
    }

    /// Boundary validation before the update is sent.
    pub fn validate(&self) -> Result<()> {
        if let Some(source) = &self.source {
            source.validate()?;
        }
        Ok(())
    }

    /// Encode the supplied fields as a JSON object.
    pub fn to_fields(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Apply the supplied fields to `doc` in place.
    pub fn apply_to(&self, doc: &mut ClipDocument) {
        let p = self.clone();
        if let Some(v) = p.name {
            doc.name = v;
        }
        if let Some(v) = p.description {
            doc.description = v;
        }
        if p.script.is_some() {
            doc.script = p.script;
        }
        if let Some(v) = p.owner_id {
            doc.owner_id = v;
        }
        if p.owner_email.is_some() {
            doc.owner_email = p.owner_email;
        }
        if p.storage_key.is_some() {
            doc.storage_key = p.storage_key;
        }
        if p.video_url.is_some() {
            doc.video_url = p.video_url;
        }
        if p.thumbnail_url.is_some() {
            doc.thumbnail_url = p.thumbnail_url;
        }
        if p.share_url.is_some() {
            doc.share_url = p.share_url;
        }
        if p.blurhash.is_some() {
            doc.blurhash = p.blurhash;
        }
        if p.duration_seconds.is_some() {
            doc.duration_seconds = p.duration_seconds;
        }
        if let Some(v) = p.characters {
            doc.characters = v;
        }
        if let Some(v) = p.tags {
            doc.tags = v;
        }
        if p.source.is_some() {
            doc.source = p.source;
        }
        if p.updated_at.is_some() {
            doc.updated_at = p.updated_at;
        }
        if p.updated_by.is_some() {
            doc.updated_by = p.updated_by;
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClipDocument`].
#[derive(Debug, Default)]
pub struct ClipDocumentBuilder {
    id: String,
    name: String,
    description: String,
    script: Option<String>,
    owner_id: String,
    owner_email: Option<String>,
    storage_key: Option<String>,
    video_url: Option<String>,
    thumbnail_url: Option<String>,
    share_url: Option<String>,
    blurhash: Option<String>,
    duration_seconds: Option<f64>,
    characters: BTreeSet<String>,
    tags: BTreeSet<String>,
    source: Option<ClipSource>,
    created_at: Option<DateTime<Utc>>,
}

impl ClipDocumentBuilder {
    /// Set the document ID.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the transcript.
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Set the owner id.
    pub fn owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    /// Set the owner email.
    pub fn owner_email(mut self, owner_email: impl Into<String>) -> Self {
        self.owner_email = Some(owner_email.into());
        self
    }

    /// Set the storage key.
    pub fn storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = Some(storage_key.into());
        self
    }

    /// Set the playback URL.
    pub fn video_url(mut self, video_url: impl Into<String>) -> Self {
        self.video_url = Some(video_url.into());
        self
    }

    /// Set the thumbnail URL.
    pub fn thumbnail_url(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    /// Set the share URL.
    pub fn share_url(mut self, share_url: impl Into<String>) -> Self {
        self.share_url = Some(share_url.into());
        self
    }

    /// Set the blurhash.
    pub fn blurhash(mut self, blurhash: impl Into<String>) -> Self {
        self.blurhash = Some(blurhash.into());
        self
    }

    /// Set the duration.
    pub fn duration_seconds(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Set the characters.
    pub fn characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.characters = characters.into_iter().map(Into::into).collect();
        self
    }

    /// Set the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source.
    pub fn source(mut self, source: ClipSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the creation time (defaults to now).
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Build the document.
    pub fn build(self) -> ClipDocument {
        ClipDocument {
            id: self.id,
            name: self.name,
            description: self.description,
            script: self.script,
            owner_id: self.owner_id,
            owner_email: self.owner_email,
            storage_key: self.storage_key,
            video_url: self.video_url,
            thumbnail_url: self.thumbnail_url,
            share_url: self.share_url,
            blurhash: self.blurhash,
            duration_seconds: self.duration_seconds,
            characters: self.characters,
            tags: self.tags,
            source: self.source,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            updated_at: None,
            updated_by: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
