use super::{chunk_records, file_metadata, read_text, ContentTransformer};
use crate::chunk::TextChunker;
use crate::classify::classify;
use crate::error::ProcessingError;
use crate::types::{Category, NormalizedRecord};
use async_trait::async_trait;
use std::path::Path;

/// Plain-text fallback: local chunking only, no external calls.
pub struct TextTransformer {
    chunker: TextChunker,
}

impl TextTransformer {
    pub fn new(chunker: TextChunker) -> Self {
        Self { chunker }
    }
}

#[async_trait]
impl ContentTransformer for TextTransformer {
    fn name(&self) -> &str {
        "text"
    }

    /// Accepts anything with an extension, so it must be registered last.
    fn can_handle(&self, path: &Path) -> bool {
        classify(path).is_some()
    }

    async fn process(&self, path: &Path) -> Result<Vec<NormalizedRecord>, ProcessingError> {
        let content = read_text(path).await?;
        let metadata = file_metadata(path, Category::Text, None).await?;
        Ok(chunk_records(&self.chunker, &content, Category::Text, &metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_chunks_share_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        std::fs::write(&path, "lorem ipsum ".repeat(250)).unwrap(); // 3000 chars

        let transformer = TextTransformer::new(TextChunker::new(1000, 0).unwrap());
        let records = transformer.process(&path).await.unwrap();

        assert_eq!(records.len(), 3);
        let expected = path.to_string_lossy().to_string();
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.metadata.path, expected);
            assert_eq!(record.metadata.chunk, Some(i));
            assert_eq!(record.category, Category::Text);
            assert!(record.summary.is_none());
        }
    }

    #[tokio::test]
    async fn test_empty_file_yields_no_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        std::fs::write(&path, "").unwrap();

        let records = TextTransformer::new(TextChunker::default())
            .process(&path)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_processing_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        std::fs::write(&path, [0xE9, 0x74, 0xE9]).unwrap();

        let err = TextTransformer::new(TextChunker::default())
            .process(&path)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("latin1.txt"));
    }
}
