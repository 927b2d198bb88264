//! Common fixtures for clipdex-search integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use clipdex_core::EngineConfig;
use clipdex_search::{ClipDocument, ClipSearch, ClipSource, MemoryEngine};

/// A service over an in-process engine, with the engine kept for inspection.
pub struct TestCatalog {
    /// Engine backing the service.
    pub engine: Arc<MemoryEngine>,
    /// The service under test.
    pub search: ClipSearch,
}

impl TestCatalog {
    /// Connected service with default configuration.
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    /// Connected service with custom configuration.
    pub async fn with_config(config: EngineConfig) -> Self {
        let engine = Arc::new(MemoryEngine::new());
        let search = ClipSearch::connect(engine.clone(), config).await;
        Self { engine, search }
    }

    /// Create every document, panicking on failure.
    pub async fn seed(&self, docs: &[ClipDocument]) {
        for doc in docs {
            self.search.create(doc).await.unwrap();
        }
    }
}

/// Deterministic timestamp `minutes` after a fixed epoch.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// A show clip.
pub fn show_clip(id: &str, name: &str, show: &str, characters: &[&str], minute: i64) -> ClipDocument {
    ClipDocument::builder()
        .id(id)
        .name(name)
        .owner_id("owner-1")
        .characters(characters.iter().copied())
        .source(ClipSource::show(show))
        .created_at(at(minute))
        .build()
}

/// A movie clip.
pub fn movie_clip(id: &str, name: &str, movie: &str, characters: &[&str], minute: i64) -> ClipDocument {
    ClipDocument::builder()
        .id(id)
        .name(name)
        .owner_id("owner-1")
        .characters(characters.iter().copied())
        .source(ClipSource::movie(movie))
        .created_at(at(minute))
        .build()
}

/// `count` plain clips with increasing creation times.
pub fn numbered_clips(count: usize) -> Vec<ClipDocument> {
    (0..count)
        .map(|i| {
            ClipDocument::builder()
                .id(format!("clip-{i:05}"))
                .name(format!("Clip {i}"))
                .owner_id("owner-1")
                .created_at(at(i as i64))
                .build()
        })
        .collect()
}

/// A small catalog mixing shows, a movie and an unsourced clip.
pub fn sample_catalog() -> Vec<ClipDocument> {
    let mut parkour = show_clip("office-1", "Parkour!", "The Office", &["Michael", "Dwight", "Andy"], 10);
    parkour.description = "Michael, Dwight and Andy do parkour around the office park".to_string();

    let mut dinner = show_clip("office-2", "Dinner Party", "The Office", &["Michael", "Jan", "Jim", "Pam"], 20);
    dinner.description = "Snip snap snip snap".to_string();

    let mut paintball = show_clip("community-1", "Modern Warfare", "Community", &["Abed", "Troy", "Jeff"], 30);
    paintball.description = "The paintball episode".to_string();

    let mut parkour_community = show_clip("community-2", "Parkour Study Group", "Community", &["Troy", "Abed"], 40);
    parkour_community.description = "Troy and Abed attempt parkour in the library".to_string();

    let mut heat = movie_clip("heat-1", "Diner Scene", "Heat", &["Neil", "Vincent"], 50);
    heat.description = "Pacino and De Niro at the diner".to_string();

    let mut home = ClipDocument::builder()
        .id("home-1")
        .name("Backyard Parkour")
        .owner_id("owner-2")
        .tags(["home-video"])
        .created_at(at(60))
        .build();
    home.description = "Kids jumping fences".to_string();

    vec![parkour, dinner, paintball, parkour_community, heat, home]
}

/// Ids of `docs`, in order.
pub fn ids(docs: &[ClipDocument]) -> Vec<&str> {
    docs.iter().map(|d| d.id.as_str()).collect()
}
