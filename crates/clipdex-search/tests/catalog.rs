//! End-to-end behaviour of the clip search service over the in-process engine.

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::{BTreeSet, HashSet};

use clipdex_core::{EngineConfig, Error, ServiceState};
use clipdex_search::{
    ClipDocument, ClipSource, PartialClipDocument, SearchParams, SortBy, WalkState,
};
use common::{TestCatalog, ids, numbered_clips, sample_catalog};
use futures::StreamExt;
use proptest::prelude::*;

// ============================================================================
// Documents
// ============================================================================

#[tokio::test]
async fn test_create_get_round_trip() {
    let catalog = TestCatalog::new().await;
    for doc in sample_catalog() {
        catalog.search.create(&doc).await.unwrap();
        assert_eq!(catalog.search.get(&doc.id).await.unwrap(), doc);
    }
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let catalog = TestCatalog::new().await;
    let err = catalog.search.get("nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { ref id } if id == "nope"));
}

#[tokio::test]
async fn test_update_touches_only_supplied_fields() {
    let catalog = TestCatalog::new().await;
    let docs = sample_catalog();
    catalog.seed(&docs).await;
    let before = docs[0].clone();

    let partial = PartialClipDocument {
        name: Some("Parkour (extended)".to_string()),
        tags: Some(BTreeSet::from(["classic".to_string()])),
        updated_by: Some("editor@example.com".to_string()),
        ..Default::default()
    };
    catalog.search.update(&before.id, &partial).await.unwrap();

    let after = catalog.search.get(&before.id).await.unwrap();
    let mut expected = before.clone();
    partial.apply_to(&mut expected);
    expected.updated_at = after.updated_at;
    assert_eq!(after, expected);
    assert_eq!(after.description, before.description);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at.is_some());
}

#[tokio::test]
async fn test_update_switches_source_variant_cleanly() {
    let catalog = TestCatalog::new().await;
    let mut doc = common::show_clip("c1", "Scene", "The Office", &[], 0);
    doc.source = Some(ClipSource::Show {
        title: "The Office".to_string(),
        air_date: None,
        season: Some(2),
        episode: Some(5),
    });
    catalog.search.create(&doc).await.unwrap();

    let partial = PartialClipDocument {
        source: Some(ClipSource::movie("Heat")),
        ..Default::default()
    };
    catalog.search.update("c1", &partial).await.unwrap();

    let stored = catalog.search.get("c1").await.unwrap();
    assert_eq!(stored.source, Some(ClipSource::movie("Heat")));
}

#[tokio::test]
async fn test_update_missing_is_not_found() {
    let catalog = TestCatalog::new().await;
    let partial = PartialClipDocument {
        name: Some("x".to_string()),
        ..Default::default()
    };
    assert!(catalog.search.update("ghost", &partial).await.unwrap_err().is_not_found());
}

// ============================================================================
// Listing
// ============================================================================

async fn assert_full_listing(count: usize, expected_pages: usize) {
    let catalog = TestCatalog::new().await;
    catalog.seed(&numbered_clips(count)).await;

    let listing = catalog.search.walk_all().await;
    assert!(listing.is_complete(), "walk over {count} failed");
    assert_eq!(listing.documents.len(), count);
    assert_eq!(listing.pages, expected_pages, "pages for {count}");

    let unique: HashSet<&str> = listing.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(unique.len(), count);
    assert!(
        listing
            .documents
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at)
    );

    let stats = catalog.engine.stats();
    assert_eq!(stats.scroll_opens, 1);
    assert_eq!(stats.live_scrolls, 0);
}

#[tokio::test]
async fn test_list_all_empty_index() {
    assert_full_listing(0, 1).await;
}

#[tokio::test]
async fn test_list_all_exact_page() {
    // A full page is followed by one empty page
    assert_full_listing(1000, 2).await;
}

#[tokio::test]
async fn test_list_all_one_past_page() {
    assert_full_listing(1001, 2).await;
}

#[tokio::test]
async fn test_list_all_page_and_a_half() {
    assert_full_listing(1500, 2).await;
}

#[tokio::test]
async fn test_list_all_newest_first() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;
    let docs = catalog.search.list_all().await;
    assert_eq!(
        ids(&docs),
        ["home-1", "heat-1", "community-2", "community-1", "office-2", "office-1"]
    );
}

#[tokio::test]
async fn test_mid_walk_failure_surfaces_partial_result() {
    let catalog = TestCatalog::with_config(EngineConfig {
        page_size: 10,
        ..Default::default()
    })
    .await;
    catalog.seed(&numbered_clips(35)).await;
    catalog.engine.fail_scroll_after(1);

    let listing = catalog.search.walk_all().await;
    assert!(!listing.is_complete());
    assert_eq!(listing.documents.len(), 20);
    assert_eq!(catalog.engine.stats().live_scrolls, 0);

    // The degrading listing hides the partial result
    assert!(catalog.search.list_all().await.is_empty());
}

#[tokio::test]
async fn test_walk_is_not_restartable() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&numbered_clips(3)).await;

    let mut walker = catalog.search.walker();
    assert_eq!(walker.next_page().await.unwrap().unwrap().len(), 3);
    assert_eq!(walker.state(), WalkState::Exhausted);
    assert!(walker.next_page().await.unwrap().is_none());

    // A second listing opens a fresh cursor
    assert_eq!(catalog.search.list_all().await.len(), 3);
    assert_eq!(catalog.engine.stats().scroll_opens, 2);
}

#[tokio::test]
async fn test_abandoned_stream_releases_cursor() {
    let catalog = TestCatalog::with_config(EngineConfig {
        page_size: 5,
        ..Default::default()
    })
    .await;
    catalog.seed(&numbered_clips(20)).await;

    let first: Vec<_> = catalog.search.walker().into_stream().take(7).collect().await;
    assert_eq!(first.len(), 7);

    for _ in 0..10 {
        if catalog.engine.stats().live_scrolls == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(catalog.engine.stats().live_scrolls, 0);
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_text_and_show_filter() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let params = SearchParams::text("parkour").with_show("The Office");
    let page = catalog.search.search(&params).await;
    assert_eq!(ids(&page.items), ["office-1"]);
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_text_matches_across_fields() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let page = catalog.search.search(&SearchParams::text("parkour")).await;
    assert_eq!(ids(&page.items), ["home-1", "community-2", "office-1"]);

    // Typo within tolerance, matched via description
    let page = catalog.search.search(&SearchParams::text("paintbal")).await;
    assert_eq!(ids(&page.items), ["community-1"]);

    // Character names are searchable
    let page = catalog.search.search(&SearchParams::text("Vincent")).await;
    assert_eq!(ids(&page.items), ["heat-1"]);
}

#[tokio::test]
async fn test_show_filter_alone_excludes_movies() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let page = catalog
        .search
        .search(&SearchParams::default().with_show("Communty"))
        .await;
    assert_eq!(ids(&page.items), ["community-2", "community-1"]);
}

#[tokio::test]
async fn test_character_filter() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let params = SearchParams::text("parkour").with_character("Abed");
    let page = catalog.search.search(&params).await;
    assert_eq!(ids(&page.items), ["community-2"]);
}

#[tokio::test]
async fn test_blank_criteria_list_everything() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let params = SearchParams {
        text: Some("  ".to_string()),
        show: Some("".to_string()),
        ..Default::default()
    };
    assert_eq!(catalog.search.search(&params).await.total, 6);
}

#[tokio::test]
async fn test_sort_by_name() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let page = catalog
        .search
        .search(&SearchParams::default().with_sort(SortBy::Name))
        .await;
    let names: Vec<&str> = page.items.iter().map(|d| d.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn test_pages_partition_results() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&numbered_clips(25)).await;

    let mut seen = Vec::new();
    for offset in (0..25).step_by(10) {
        let page = catalog
            .search
            .search(&SearchParams::default().with_page(offset, 10))
            .await;
        assert_eq!(page.total, 25);
        assert!(page.items.len() <= 10);
        seen.extend(page.items.into_iter().map(|d| d.id));
    }
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(seen.len(), 25);
    assert_eq!(unique.len(), 25);

    let past_end = catalog
        .search
        .search(&SearchParams::default().with_page(100, 10))
        .await;
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.total, 25);
}

fn clips_from(entries: &[(String, i64)]) -> Vec<ClipDocument> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (name, minute))| {
            ClipDocument::builder()
                .id(format!("p-{i}"))
                .name(name.clone())
                .owner_id("owner")
                .created_at(common::at(*minute))
                .build()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_search_order_invariants(
        entries in prop::collection::vec(("[a-z]{1,8}", 0i64..10_000), 0..40),
        limit in 1usize..15,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let catalog = TestCatalog::new().await;
            catalog.seed(&clips_from(&entries)).await;

            let newest = catalog
                .search
                .search(&SearchParams::default().with_page(0, limit))
                .await;
            assert_eq!(newest.total, entries.len() as u64);
            assert!(newest.items.len() <= limit);
            assert!(newest.items.windows(2).all(|w| w[0].created_at >= w[1].created_at));

            let by_name = catalog
                .search
                .search(&SearchParams::default().with_sort(SortBy::Name).with_page(0, limit))
                .await;
            assert!(by_name.items.windows(2).all(|w| w[0].name <= w[1].name));
        });
    }
}

// ============================================================================
// Facets
// ============================================================================

#[tokio::test]
async fn test_show_facet_counts() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let shows = catalog.search.available_shows(None).await;
    let names: Vec<&str> = shows.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Community", "The Office"]);
    assert!(shows.iter().all(|f| f.count == 2));

    // Every show clip is counted exactly once
    let show_clips = sample_catalog()
        .iter()
        .filter(|d| d.show_title().is_some())
        .count() as u64;
    assert_eq!(shows.iter().map(|f| f.count).sum::<u64>(), show_clips);
}

#[tokio::test]
async fn test_character_facet_scoped_by_show() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let characters = catalog.search.available_characters(Some("Community")).await;
    let pairs: Vec<(&str, u64)> = characters
        .iter()
        .map(|f| (f.name.as_str(), f.count))
        .collect();
    assert_eq!(pairs, [("Abed", 2), ("Jeff", 1), ("Troy", 2)]);

    let all = catalog.search.available_characters(None).await;
    let unique: HashSet<&str> = all.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(unique.len(), all.len());
    assert!(all.iter().any(|f| f.name == "Vincent"));
}

#[tokio::test]
async fn test_show_facet_scoped_by_character() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;

    let shows = catalog.search.available_shows(Some("Michael")).await;
    assert_eq!(shows.len(), 1);
    assert_eq!(shows[0].name, "The Office");
    assert_eq!(shows[0].count, 2);
}

#[tokio::test]
async fn test_facet_size_caps_values() {
    let catalog = TestCatalog::with_config(EngineConfig {
        facet_size: 2,
        ..Default::default()
    })
    .await;
    catalog.seed(&sample_catalog()).await;

    let characters = catalog.search.available_characters(None).await;
    assert_eq!(characters.len(), 2);
    assert_eq!(characters[0].name, "Abed");
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_reads_degrade_to_empty_when_engine_down() {
    let catalog = TestCatalog::new().await;
    catalog.seed(&sample_catalog()).await;
    catalog.engine.set_unavailable(true);

    assert!(catalog.search.search(&SearchParams::text("parkour")).await.is_empty());
    assert!(catalog.search.list_all().await.is_empty());
    assert!(catalog.search.available_shows(None).await.is_empty());
    assert!(catalog.search.available_characters(None).await.is_empty());

    // Strict variants keep the cause
    let err = catalog
        .search
        .try_search(&SearchParams::default())
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(!catalog.search.walk_all().await.is_complete());
}

#[tokio::test]
async fn test_writes_fail_loudly_when_engine_down() {
    let catalog = TestCatalog::new().await;
    catalog.engine.set_unavailable(true);

    let doc = common::show_clip("c1", "Scene", "The Office", &[], 0);
    assert!(catalog.search.create(&doc).await.unwrap_err().is_unavailable());
    let partial = PartialClipDocument {
        name: Some("x".to_string()),
        ..Default::default()
    };
    assert!(catalog.search.update("c1", &partial).await.unwrap_err().is_retryable());
}

#[tokio::test]
async fn test_start_degraded_then_recover() {
    let engine = std::sync::Arc::new(clipdex_search::MemoryEngine::new());
    engine.set_unavailable(true);
    let search = clipdex_search::ClipSearch::connect(engine.clone(), EngineConfig::default()).await;
    assert!(matches!(search.state(), ServiceState::Degraded(_)));

    engine.set_unavailable(false);
    search.start().await;
    assert_eq!(search.state(), ServiceState::Ready);

    search.create(&common::show_clip("c1", "Scene", "The Office", &["Pam"], 0)).await.unwrap();
    assert_eq!(search.search(&SearchParams::text("scene")).await.total, 1);
}
