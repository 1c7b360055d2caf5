use super::cache::QueryCache;
use super::filter::{cache_key, SearchFilters};
use super::routing::{QueryRouter, Route};
use crate::embedding::EmbeddingProvider;
use crate::error::QueryError;
use crate::store::VectorStore;
use crate::types::{Partition, SearchResult};
use anyhow::anyhow;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub max_results: usize,
    /// Minimum cosine similarity a hit needs to be returned
    pub similarity_threshold: f32,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    /// Hits taken from the caption collection for an image-routed query
    pub image_k: usize,
    /// Vanilla hits appended after image-routed ones
    pub supplement_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            similarity_threshold: 0.7,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(3600),
            image_k: 3,
            supplement_k: 2,
        }
    }
}

/// Answers natural-language queries against the current store.
///
/// Starts unloaded. `bind` or `load_from_disk` install a store; each also clears the
/// cache so results computed against an older store are never served.
pub struct QueryEngine {
    config: QueryConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    router: Option<Arc<dyn QueryRouter>>,
    store: RwLock<Option<Arc<VectorStore>>>,
    cache: QueryCache,
}

impl QueryEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: QueryConfig) -> Self {
        let cache = QueryCache::new(config.cache_ttl);
        Self {
            config,
            embedder,
            router: None,
            store: RwLock::new(None),
            cache,
        }
    }

    pub fn with_router(mut self, router: Arc<dyn QueryRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn is_loaded(&self) -> bool {
        self.store.read().await.is_some()
    }

    pub async fn bind(&self, store: Arc<VectorStore>) {
        *self.store.write().await = Some(store);
        self.cache.clear();
    }

    /// Replace the current store with the one persisted in `dir`. The previous store stays
    /// in place on failure.
    pub async fn load_from_disk(&self, dir: &Path) -> Result<(), QueryError> {
        let dir = dir.to_path_buf();
        let store = tokio::task::spawn_blocking(move || VectorStore::load(&dir))
            .await
            .map_err(|e| QueryError::StoreLoad(anyhow!("store load task failed: {}", e)))?
            .map_err(QueryError::StoreLoad)?;
        info!(documents = store.len(), "Vector store loaded");
        self.bind(Arc::new(store)).await;
        Ok(())
    }

    pub async fn search(
        &self,
        query: &str,
        filters: &Map<String, Value>,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let parsed = SearchFilters::from_map(filters)?;
        let store = self
            .store
            .read()
            .await
            .clone()
            .ok_or(QueryError::StoreNotLoaded)?;

        let key = cache_key(query, filters);
        if self.config.cache_enabled {
            if let Some(hit) = self.cache.get(&key) {
                debug!(query = %query, "Cache hit");
                return Ok(hit);
            }
        }

        let results = match &self.router {
            Some(router) => self.routed(router.as_ref(), &store, query, &parsed).await?,
            None => {
                self.retrieve(&store, query, self.config.max_results, None, &parsed)
                    .await?
            }
        };

        if self.config.cache_enabled {
            self.cache.insert(key, results.clone());
        }
        Ok(results)
    }

    async fn routed(
        &self,
        router: &dyn QueryRouter,
        store: &VectorStore,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, QueryError> {
        match router.route(query).await {
            Ok(Route::Image { rewritten }) => {
                debug!(rewritten = %rewritten, "Routing to image captions");
                let mut results = self
                    .retrieve(store, &rewritten, self.config.image_k, Some(Partition::ImageCaption), filters)
                    .await?;
                let extra = self
                    .retrieve(store, query, self.config.supplement_k, None, filters)
                    .await?;
                for hit in extra {
                    if !results.iter().any(|r| r.path == hit.path) {
                        results.push(hit);
                    }
                }
                Ok(results)
            }
            Ok(Route::Vanilla) => {
                self.retrieve(store, query, self.config.max_results, None, filters)
                    .await
            }
            Err(e) => {
                warn!(error = %e, "Query routing failed, using vanilla search");
                self.retrieve(store, query, self.config.max_results, None, filters)
                    .await
            }
        }
    }

    /// Top-k, then score floor, then filters, then one hit per path.
    async fn retrieve(
        &self,
        store: &VectorStore,
        query: &str,
        k: usize,
        partition: Option<Partition>,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(QueryError::Embedding)?;

        let mut seen = HashSet::new();
        Ok(store
            .search_partition(&vector, k, partition)
            .into_iter()
            .filter(|(_, score)| *score >= self.config.similarity_threshold)
            .filter(|(doc, _)| filters.matches(&doc.metadata))
            .filter(|(doc, _)| seen.insert(doc.metadata.path.clone()))
            .map(|(doc, score)| SearchResult {
                path: doc.metadata.path.clone(),
                score,
                metadata: doc.metadata.clone(),
            })
            .collect())
    }
}
