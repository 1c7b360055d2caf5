#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use seeker_engine::{
    EmbeddingProvider, GenerateConfig, GenerateResponse, ImageCaptioner, Indexer, IndexerConfig,
    LLMProvider, Message, StoreBuilder, TextChunker, TransformConfig, TransformerChain, Usage,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const VOCAB: &[&str] = &[
    "cat", "dog", "beach", "tax", "invoice", "python", "numbers", "rust", "garden", "budget",
];

/// Bag-of-words embedding over [`VOCAB`]; texts sharing no vocabulary word score 0.
#[derive(Default)]
pub struct KeywordEmbedding {
    embedded: AtomicUsize,
}

impl KeywordEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of texts embedded so far, queries included.
    pub fn embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        VOCAB
            .iter()
            .map(|v| words.iter().filter(|w| *w == v).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedded.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }
}

/// Summarizer returning one fixed reply, or failing when `reply` is `None`.
pub struct StaticLlm {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl StaticLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for StaticLlm {
    async fn generate(&self, _messages: &[Message], _config: &GenerateConfig) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(text) => Ok(GenerateResponse {
                text: text.clone(),
                usage: Usage::default(),
                model: "static".into(),
            }),
            None => bail!("service unavailable"),
        }
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

pub struct StaticCaptioner {
    caption: Option<String>,
    calls: AtomicUsize,
}

impl StaticCaptioner {
    pub fn new(caption: &str) -> Self {
        Self {
            caption: Some(caption.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            caption: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageCaptioner for StaticCaptioner {
    async fn caption(&self, _image: &[u8]) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.caption {
            Some(c) => Ok(vec![c.clone()]),
            None => bail!("captioner returned 503"),
        }
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

pub struct Harness {
    pub embedder: Arc<KeywordEmbedding>,
    pub llm: Arc<StaticLlm>,
    pub captioner: Arc<StaticCaptioner>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            embedder: Arc::new(KeywordEmbedding::new()),
            llm: Arc::new(StaticLlm::replying("Adds two numbers.")),
            captioner: Arc::new(StaticCaptioner::new("a dog on a beach")),
        }
    }

    pub fn with_captioner(mut self, captioner: StaticCaptioner) -> Self {
        self.captioner = Arc::new(captioner);
        self
    }

    pub fn with_llm(mut self, llm: StaticLlm) -> Self {
        self.llm = Arc::new(llm);
        self
    }

    /// 1000-char chunks, no overlap.
    pub fn chain(&self) -> TransformerChain {
        let config = TransformConfig {
            chunker: TextChunker::new(1000, 0).unwrap(),
            service_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        TransformerChain::standard(self.llm.clone(), self.captioner.clone(), config).unwrap()
    }

    pub fn indexer(&self, root: &Path, index_dir: &Path) -> Indexer {
        Indexer::open(
            IndexerConfig::new(root, index_dir),
            self.chain(),
            StoreBuilder::new(self.embedder.clone()),
        )
    }
}

/// Push a file's mtime forward so the change detector sees it as modified.
pub fn bump_mtime(path: &Path, secs: u64) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    let modified = std::fs::metadata(path).unwrap().modified().unwrap();
    file.set_modified(modified + Duration::from_secs(secs)).unwrap();
}

pub fn key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap()
        .to_string_lossy()
        .to_string()
}
