//! Index mapping for clip documents.
//!
//! # Fields
//!
//! ## Full-Text Fields (tokenized, searched with fuzzy multi-match)
//! - `name`: TEXT + `name.keyword` KEYWORD for alphabetical sort, boost 2.0x
//! - `description`, `script`: TEXT, boost 1.0x
//!
//! ## Facet Fields (exact match, aggregatable)
//! - `characters`, `tags`: KEYWORD sets, also searched as whole values
//! - `source.type`: KEYWORD (`show` | `movie`)
//! - `source.title`: TEXT + `source.title.keyword` KEYWORD
//!
//! ## Opaque Fields (KEYWORD, never tokenized)
//! - `id`, `ownerId`, `ownerEmail`, `storageKey`, `videoUrl`,
//!   `thumbnailUrl`, `shareUrl`, `blurhash`, `updatedBy`
//!
//! ## Typed Fields
//! - `durationSeconds`: FLOAT
//! - `source.season`, `source.episode`: INTEGER
//! - `source.airDate`, `source.releaseDate`, `createdAt`, `updatedAt`: DATE

use serde_json::{Map, Value, json};

/// Schema version recorded in the mapping `_meta`.
///
/// Increment this when field mappings change.
pub const SCHEMA_VERSION: u32 = 1;

/// Field paths used by queries, sorts, and aggregations.
pub mod fields {
    /// Document id.
    pub const ID: &str = "id";
    /// Tokenized clip name.
    pub const NAME: &str = "name";
    /// Exact clip name, used for sorting.
    pub const NAME_KEYWORD: &str = "name.keyword";
    /// Free-text description.
    pub const DESCRIPTION: &str = "description";
    /// Transcript.
    pub const SCRIPT: &str = "script";
    /// Character set.
    pub const CHARACTERS: &str = "characters";
    /// Tag set.
    pub const TAGS: &str = "tags";
    /// Source variant discriminator.
    pub const SOURCE_TYPE: &str = "source.type";
    /// Tokenized source title.
    pub const SOURCE_TITLE: &str = "source.title";
    /// Exact source title, used for facets.
    pub const SOURCE_TITLE_KEYWORD: &str = "source.title.keyword";
    /// Creation timestamp.
    pub const CREATED_AT: &str = "createdAt";
}

/// `source.type` value for shows.
pub const SOURCE_TYPE_SHOW: &str = "show";

/// `source.type` value for movies.
pub const SOURCE_TYPE_MOVIE: &str = "movie";

/// The clip index schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipSchema;

impl ClipSchema {
    /// Full-text fields with their boost weights, in order of importance.
    pub fn full_text_fields(&self) -> Vec<(&'static str, f32)> {
        vec![
            (fields::NAME, 2.0),
            (fields::DESCRIPTION, 1.0),
            (fields::SCRIPT, 1.0),
            (fields::CHARACTERS, 1.0),
            (fields::TAGS, 1.0),
        ]
    }

    /// Index creation body (`mappings` with `_meta`).
    pub fn index_body(&self) -> Value {
        json!({ "mappings": self.mappings() })
    }

    /// Field mappings.
    pub fn mappings(&self) -> Value {
        let mut properties = Map::new();

        for field in [
            "id",
            "ownerId",
            "ownerEmail",
            "storageKey",
            "videoUrl",
            "thumbnailUrl",
            "shareUrl",
            "blurhash",
            "updatedBy",
        ] {
            properties.insert(field.to_string(), keyword());
        }

        properties.insert(fields::NAME.to_string(), text_with_keyword());
        properties.insert(fields::DESCRIPTION.to_string(), text());
        properties.insert(fields::SCRIPT.to_string(), text());
        properties.insert(fields::CHARACTERS.to_string(), keyword());
        properties.insert(fields::TAGS.to_string(), keyword());
        properties.insert("durationSeconds".to_string(), json!({ "type": "float" }));
        properties.insert(fields::CREATED_AT.to_string(), date());
        properties.insert("updatedAt".to_string(), date());
        properties.insert(
            "source".to_string(),
            json!({
                "properties": {
                    "type": keyword(),
                    "title": text_with_keyword(),
                    "airDate": date(),
                    "season": { "type": "integer" },
                    "episode": { "type": "integer" },
                    "releaseDate": date(),
                }
            }),
        );

        json!({
            "_meta": { "schema_version": SCHEMA_VERSION },
            "properties": properties,
        })
    }
}

fn keyword() -> Value {
    json!({ "type": "keyword" })
}

fn text() -> Value {
    json!({ "type": "text" })
}

fn date() -> Value {
    json!({ "type": "date" })
}

/// Tokenized text with an exact `keyword` sub-field.
fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "fields": {
            "keyword": { "type": "keyword", "ignore_above": 256 }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_mapped_fields() {
        let mappings = ClipSchema.mappings();
        let props = &mappings["properties"];

        assert_eq!(props["name"]["type"], "text");
        assert_eq!(props["name"]["fields"]["keyword"]["type"], "keyword");

        let title = &props["source"]["properties"]["title"];
        assert_eq!(title["type"], "text");
        assert_eq!(title["fields"]["keyword"]["type"], "keyword");
    }

    #[test]
    fn test_opaque_fields_are_keywords() {
        let mappings = ClipSchema.mappings();
        let props = &mappings["properties"];
        for field in ["ownerId", "storageKey", "videoUrl", "shareUrl", "blurhash"] {
            assert_eq!(props[field]["type"], "keyword", "{field}");
        }
        assert_eq!(props["characters"]["type"], "keyword");
        assert_eq!(props["source"]["properties"]["type"]["type"], "keyword");
    }

    #[test]
    fn test_typed_fields() {
        let mappings = ClipSchema.mappings();
        let props = &mappings["properties"];
        assert_eq!(props["durationSeconds"]["type"], "float");
        assert_eq!(props["createdAt"]["type"], "date");
        assert_eq!(props["source"]["properties"]["season"]["type"], "integer");
        assert_eq!(props["source"]["properties"]["releaseDate"]["type"], "date");
    }

    #[test]
    fn test_full_text_fields_boost() {
        let fields = ClipSchema.full_text_fields();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], ("name", 2.0));
        assert!(fields[1..].iter().all(|(_, boost)| *boost == 1.0));
    }

    #[test]
    fn test_index_body_carries_version() {
        let body = ClipSchema.index_body();
        assert_eq!(
            body["mappings"]["_meta"]["schema_version"],
            SCHEMA_VERSION
        );
    }
}
