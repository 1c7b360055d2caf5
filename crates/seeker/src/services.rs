use crate::config::Settings;
use anyhow::{Context, Result};
use seeker_engine::{
    EmbeddingProvider, HuggingFaceCaptioner, ImageCaptioner, Indexer, IndexerConfig, LLMProvider,
    LlmRouter, OpenAIClient, OpenAIEmbedding, QueryConfig, QueryEngine, StoreBuilder,
    TextChunker, TransformConfig, TransformerChain,
};
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, built once from settings.
pub struct Services {
    pub indexer: Arc<Indexer>,
    pub query: Arc<QueryEngine>,
}

pub fn build(settings: &Settings) -> Result<Services> {
    let timeout = Duration::from_secs(settings.services.timeout_secs);
    let api_key = settings.services.openai_api_key.clone().unwrap_or_default();
    let base_url = settings
        .services
        .openai_base_url
        .as_deref()
        .map(|u| u.trim_end_matches('/').to_string());

    let mut embedding = OpenAIEmbedding::new(&api_key, timeout)?.with_model(
        &settings.services.embedding_model,
        settings.services.embedding_dimensions,
    );
    let mut chat = OpenAIClient::new(&api_key, timeout)?.with_model(&settings.services.summary_model);
    if let Some(base) = &base_url {
        embedding = embedding.with_base_url(&format!("{}/embeddings", base));
        chat = chat.with_base_url(&format!("{}/chat/completions", base));
    }
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedding);
    let summarizer: Arc<dyn LLMProvider> = Arc::new(chat);

    let captioner: Arc<dyn ImageCaptioner> = Arc::new(
        HuggingFaceCaptioner::new(
            settings.services.hf_bearer_token.as_deref().unwrap_or_default(),
            timeout,
        )?
        .with_url(&settings.services.caption_url),
    );

    let chunker = TextChunker::new(settings.index.chunk_size, settings.index.chunk_overlap)
        .context("Invalid chunk settings")?;
    let chain = TransformerChain::standard(
        summarizer.clone(),
        captioner,
        TransformConfig {
            chunker,
            summary_token_budget: settings.index.summary_token_budget,
            service_timeout: timeout,
            summary_model: settings.services.summary_model.clone(),
        },
    )?;

    let indexer = Indexer::open(
        IndexerConfig {
            root: settings.root_path(),
            index_dir: settings.index_dir(),
            excluded_dirs: settings.index.excluded_dirs.clone(),
            max_concurrency: settings.index.max_concurrency.max(1),
        },
        chain,
        StoreBuilder::new(embedder.clone()),
    );

    let mut query = QueryEngine::new(
        embedder,
        QueryConfig {
            max_results: settings.search.max_results,
            similarity_threshold: settings.search.similarity_threshold,
            cache_enabled: settings.search.enable_cache,
            cache_ttl: Duration::from_secs(settings.search.cache_ttl_secs),
            ..Default::default()
        },
    );
    if settings.search.llm_routing {
        query = query.with_router(Arc::new(
            LlmRouter::new(summarizer, timeout).with_model(&settings.services.summary_model),
        ));
    }

    Ok(Services {
        indexer: Arc::new(indexer),
        query: Arc::new(query),
    })
}
