//! Per-category content transformers and first-match dispatch.
//!
//! Registration order is part of the contract: [`TransformerChain::standard`] registers
//! Code, then Image, then Text. Text accepts any path with an extension, so anything
//! registered after it would never be reached.

pub mod code;
pub mod image;
pub mod text;

use crate::caption::ImageCaptioner;
use crate::chunk::TextChunker;
use crate::error::{ProcessingError, ServiceError};
use crate::llm::LLMProvider;
use crate::types::{Category, DocumentMetadata, NormalizedRecord};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use code::CodeTransformer;
pub use image::ImageTransformer;
pub use text::TextTransformer;

/// Turns one file into normalized records ready for embedding.
#[async_trait]
pub trait ContentTransformer: Send + Sync {
    fn name(&self) -> &str;

    fn can_handle(&self, path: &Path) -> bool;

    async fn process(&self, path: &Path) -> Result<Vec<NormalizedRecord>, ProcessingError>;
}

/// Settings shared by the standard transformers.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub chunker: TextChunker,
    /// Code at or above this many cl100k tokens is never sent for summarization
    pub summary_token_budget: usize,
    /// Upper bound on each summarizer/captioner call
    pub service_timeout: Duration,
    pub summary_model: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            chunker: TextChunker::default(),
            summary_token_budget: 5000,
            service_timeout: Duration::from_secs(60),
            summary_model: String::new(),
        }
    }
}

/// Ordered list of transformers; the first whose `can_handle` accepts a path wins.
#[derive(Default, Clone)]
pub struct TransformerChain {
    transformers: Vec<Arc<dyn ContentTransformer>>,
}

impl TransformerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code before Image before Text.
    pub fn standard(
        summarizer: Arc<dyn LLMProvider>,
        captioner: Arc<dyn ImageCaptioner>,
        config: TransformConfig,
    ) -> anyhow::Result<Self> {
        Ok(Self::new()
            .register(Arc::new(CodeTransformer::new(summarizer, &config)?))
            .register(Arc::new(ImageTransformer::new(captioner, config.service_timeout)))
            .register(Arc::new(TextTransformer::new(config.chunker))))
    }

    pub fn register(mut self, transformer: Arc<dyn ContentTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn select(&self, path: &Path) -> Option<&Arc<dyn ContentTransformer>> {
        self.transformers.iter().find(|t| t.can_handle(path))
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }
}

/// Run an external service call under a timeout, mapping failures to [`ServiceError`].
pub(crate) async fn call_service<T, F>(
    service: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ServiceError::Request {
            service,
            message: format!("{:#}", e),
        }),
        Err(_) => Err(ServiceError::Timeout {
            service,
            after: timeout,
        }),
    }
}

pub(crate) async fn file_metadata(
    path: &Path,
    category: Category,
    language: Option<&str>,
) -> Result<DocumentMetadata, ProcessingError> {
    let meta = tokio::fs::metadata(path)
        .await
        .context("Failed to read metadata")
        .map_err(|e| ProcessingError::new(path, e))?;
    let modified = meta
        .modified()
        .context("Filesystem does not report mtime")
        .map_err(|e| ProcessingError::new(path, e))?;

    Ok(DocumentMetadata {
        path: path.to_string_lossy().to_string(),
        file_type: category,
        size: meta.len(),
        modified: DateTime::<Utc>::from(modified),
        language: language.map(str::to_string),
        chunk: None,
    })
}

/// Read a file as UTF-8 text, rejecting binary content (null byte heuristic).
pub(crate) async fn read_text(path: &Path) -> Result<String, ProcessingError> {
    let bytes = tokio::fs::read(path)
        .await
        .context("Failed to read file")
        .map_err(|e| ProcessingError::new(path, e))?;

    let check_len = bytes.len().min(8192);
    if bytes[..check_len].contains(&0) {
        return Err(ProcessingError::new(path, anyhow!("File looks binary")));
    }

    String::from_utf8(bytes)
        .context("File is not valid UTF-8")
        .map_err(|e| ProcessingError::new(path, e))
}

/// One record per chunk, sharing the file's metadata apart from the chunk index.
pub(crate) fn chunk_records(
    chunker: &TextChunker,
    content: &str,
    category: Category,
    metadata: &DocumentMetadata,
) -> Vec<NormalizedRecord> {
    chunker
        .split(content)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| NormalizedRecord {
            content: chunk,
            summary: None,
            category,
            metadata: DocumentMetadata {
                chunk: Some(i),
                ..metadata.clone()
            },
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn chain() -> TransformerChain {
        TransformerChain::standard(
            Arc::new(FixedSummarizer::ok("summary")),
            Arc::new(FixedCaptioner(vec!["a cat".into()])),
            TransformConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_standard_registration_order() {
        assert_eq!(chain().names(), vec!["code", "image", "text"]);
    }

    #[test]
    fn test_first_match_dispatch() {
        let chain = chain();
        assert_eq!(chain.select(Path::new("a.py")).unwrap().name(), "code");
        assert_eq!(chain.select(Path::new("b.PNG")).unwrap().name(), "image");
        assert_eq!(chain.select(Path::new("c.txt")).unwrap().name(), "text");
        assert!(chain.select(Path::new("README")).is_none());
    }

    #[test]
    fn test_text_first_would_shadow_code() {
        // Text accepts every path with an extension, so order decides the outcome
        let chain = TransformerChain::new()
            .register(Arc::new(TextTransformer::new(TextChunker::default())))
            .register(Arc::new(
                CodeTransformer::new(
                    Arc::new(FixedSummarizer::ok("s")),
                    &TransformConfig::default(),
                )
                .unwrap(),
            ));
        assert_eq!(chain.select(Path::new("a.py")).unwrap().name(), "text");
    }

    #[tokio::test]
    async fn test_call_service_timeout() {
        let result: Result<(), ServiceError> = call_service(
            "summarizer",
            Duration::from_millis(20),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_read_text_rejects_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blob.dat");
        std::fs::write(&path, [0u8, 159, 146, 150]).unwrap();
        let err = read_text(&path).await.unwrap_err();
        assert_eq!(err.path, path);
    }
}
