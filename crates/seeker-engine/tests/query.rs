mod common;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::KeywordEmbedding;
use seeker_engine::{
    Category, DocumentMetadata, NormalizedRecord, QueryConfig, QueryEngine, QueryError,
    QueryRouter, Route, StoreBuilder, VectorStore,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn record(path: &str, category: Category, content: &str, size: u64, chunk: Option<usize>) -> NormalizedRecord {
    NormalizedRecord {
        content: content.to_string(),
        summary: None,
        category,
        metadata: DocumentMetadata {
            path: path.to_string(),
            file_type: category,
            size,
            modified: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            language: None,
            chunk,
        },
    }
}

async fn build(embedder: Arc<KeywordEmbedding>, records: Vec<NormalizedRecord>) -> Arc<VectorStore> {
    Arc::new(StoreBuilder::new(embedder).build(records).await.unwrap())
}

fn filters(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn no_filters() -> Map<String, Value> {
    Map::new()
}

fn paths(results: &[seeker_engine::SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.path.as_str()).collect()
}

#[tokio::test]
async fn test_search_requires_loaded_store() {
    let engine = QueryEngine::new(Arc::new(KeywordEmbedding::new()), QueryConfig::default());
    assert!(!engine.is_loaded().await);
    let err = engine.search("cat", &no_filters()).await.unwrap_err();
    assert!(matches!(err, QueryError::StoreNotLoaded));
}

#[tokio::test]
async fn test_invalid_filter_never_touches_store() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let engine = QueryEngine::new(embedder.clone(), QueryConfig::default());

    // Rejected even before a store is bound
    let err = engine
        .search("cat", &filters(json!({"min_size": "large"})))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidFilter(_)));

    engine
        .bind(build(embedder.clone(), vec![record("/a.txt", Category::Text, "cat", 10, Some(0))]).await)
        .await;
    let embedded = embedder.embedded();

    let err = engine
        .search("cat", &filters(json!({"owner": "root"})))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidFilter(_)));
    assert_eq!(embedder.embedded(), embedded);
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_scores_below_threshold_are_dropped() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let engine = QueryEngine::new(embedder.clone(), QueryConfig::default());
    engine
        .bind(
            build(
                embedder,
                vec![
                    record("/exact.txt", Category::Text, "cat", 10, Some(0)),
                    record("/pair.txt", Category::Text, "cat dog", 10, Some(0)),
                    record("/triple.txt", Category::Text, "cat dog beach", 10, Some(0)),
                    record("/tax.txt", Category::Text, "tax invoice", 10, Some(0)),
                ],
            )
            .await,
        )
        .await;

    let results = engine.search("cat", &no_filters()).await.unwrap();
    assert_eq!(paths(&results), vec!["/exact.txt", "/pair.txt"]);
    assert!(results.iter().all(|r| r.score >= 0.7));
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn test_one_hit_per_path() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let engine = QueryEngine::new(embedder.clone(), QueryConfig::default());
    engine
        .bind(
            build(
                embedder,
                vec![
                    record("/notes.txt", Category::Text, "garden garden", 10, Some(0)),
                    record("/notes.txt", Category::Text, "garden", 10, Some(1)),
                    record("/plan.txt", Category::Text, "garden budget garden", 10, Some(0)),
                ],
            )
            .await,
        )
        .await;

    let results = engine.search("garden", &no_filters()).await.unwrap();
    assert_eq!(paths(&results), vec!["/notes.txt", "/plan.txt"]);
    assert_eq!(results[0].metadata.chunk, Some(0));
}

#[tokio::test]
async fn test_filters_combine_and_keep_order() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let engine = QueryEngine::new(embedder.clone(), QueryConfig::default());
    engine
        .bind(
            build(
                embedder,
                vec![
                    record("/big.txt", Category::Text, "rust rust", 5000, Some(0)),
                    record("/small.txt", Category::Text, "rust", 50, Some(0)),
                    record("/lib.rs", Category::Code, "rust", 5000, Some(0)),
                    record("/mid.txt", Category::Text, "rust rust python", 800, Some(0)),
                ],
            )
            .await,
        )
        .await;

    let all = engine.search("rust", &no_filters()).await.unwrap();
    let filtered = engine
        .search("rust", &filters(json!({"file_type": "text", "min_size": 100})))
        .await
        .unwrap();

    assert_eq!(paths(&filtered), vec!["/big.txt", "/mid.txt"]);
    let expected: Vec<&str> = all
        .iter()
        .filter(|r| r.metadata.file_type == Category::Text && r.metadata.size >= 100)
        .map(|r| r.path.as_str())
        .collect();
    assert_eq!(paths(&filtered), expected);
    assert!(filtered.windows(2).all(|w| w[0].score >= w[1].score));

    let dated = engine
        .search("rust", &filters(json!({"max_date": "2024-04-30"})))
        .await
        .unwrap();
    assert!(dated.is_empty());
}

#[tokio::test]
async fn test_cache_hit_and_expiry() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let config = QueryConfig {
        cache_ttl: Duration::from_millis(100),
        ..Default::default()
    };
    let engine = QueryEngine::new(embedder.clone(), config);
    engine
        .bind(build(embedder.clone(), vec![record("/dog.txt", Category::Text, "dog", 3, Some(0))]).await)
        .await;

    let first = engine.search("dog", &no_filters()).await.unwrap();
    let embedded = embedder.embedded();
    let second = engine.search("dog", &no_filters()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(embedder.embedded(), embedded);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let third = engine.search("dog", &no_filters()).await.unwrap();
    assert_eq!(first, third);
    assert_eq!(embedder.embedded(), embedded + 1);
}

#[tokio::test]
async fn test_disabled_cache_always_recomputes() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let config = QueryConfig {
        cache_enabled: false,
        ..Default::default()
    };
    let engine = QueryEngine::new(embedder.clone(), config);
    engine
        .bind(build(embedder.clone(), vec![record("/dog.txt", Category::Text, "dog", 3, Some(0))]).await)
        .await;

    engine.search("dog", &no_filters()).await.unwrap();
    let embedded = embedder.embedded();
    engine.search("dog", &no_filters()).await.unwrap();
    assert_eq!(embedder.embedded(), embedded + 1);
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_rebinding_clears_cache() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let engine = QueryEngine::new(embedder.clone(), QueryConfig::default());
    engine
        .bind(build(embedder.clone(), vec![record("/old.txt", Category::Text, "dog", 3, Some(0))]).await)
        .await;
    assert_eq!(paths(&engine.search("dog", &no_filters()).await.unwrap()), vec!["/old.txt"]);

    engine
        .bind(build(embedder.clone(), vec![record("/new.txt", Category::Text, "dog", 3, Some(0))]).await)
        .await;
    assert_eq!(paths(&engine.search("dog", &no_filters()).await.unwrap()), vec!["/new.txt"]);
}

#[tokio::test]
async fn test_load_from_disk() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(KeywordEmbedding::new());
    let store = build(embedder.clone(), vec![record("/cat.txt", Category::Text, "cat", 3, Some(0))]).await;
    store.save(dir.path()).unwrap();

    let engine = QueryEngine::new(embedder, QueryConfig::default());
    let err = engine
        .load_from_disk(&dir.path().join("nowhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::StoreLoad(_)));
    assert!(!engine.is_loaded().await);

    engine.load_from_disk(dir.path()).await.unwrap();
    assert_eq!(paths(&engine.search("cat", &no_filters()).await.unwrap()), vec!["/cat.txt"]);
}

struct FixedRouter(Option<Route>);

#[async_trait]
impl QueryRouter for FixedRouter {
    async fn route(&self, _query: &str) -> Result<Route> {
        match &self.0 {
            Some(route) => Ok(route.clone()),
            None => bail!("router unavailable"),
        }
    }
}

fn mixed_records() -> Vec<NormalizedRecord> {
    vec![
        record("/photos/beach.png", Category::Image, "A picture of a dog on a beach", 900, None),
        record("/photos/yard.png", Category::Image, "A picture of a dog", 900, None),
        record("/notes/dog.txt", Category::Text, "dog", 20, Some(0)),
        record("/notes/beach.txt", Category::Text, "beach", 20, Some(0)),
    ]
}

#[tokio::test]
async fn test_router_failure_falls_back_to_vanilla() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let store = build(embedder.clone(), mixed_records()).await;

    let vanilla = QueryEngine::new(embedder.clone(), QueryConfig::default());
    vanilla.bind(store.clone()).await;
    let routed = QueryEngine::new(embedder.clone(), QueryConfig::default())
        .with_router(Arc::new(FixedRouter(None)));
    routed.bind(store).await;

    let expected = vanilla.search("dog", &no_filters()).await.unwrap();
    let actual = routed.search("dog", &no_filters()).await.unwrap();
    assert!(!expected.is_empty());
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_image_route_prefers_captions() {
    let embedder = Arc::new(KeywordEmbedding::new());
    let engine = QueryEngine::new(embedder.clone(), QueryConfig::default()).with_router(Arc::new(
        FixedRouter(Some(Route::Image {
            rewritten: "dog beach".into(),
        })),
    ));
    engine.bind(build(embedder, mixed_records()).await).await;

    let results = engine.search("dog", &no_filters()).await.unwrap();
    // caption hits for the rewritten query first, then vanilla hits for new paths
    assert_eq!(
        paths(&results),
        vec!["/photos/beach.png", "/photos/yard.png", "/notes/dog.txt"]
    );
}
