use super::vector_store::VectorStore;
use crate::embedding::EmbeddingProvider;
use crate::types::{Category, EmbeddedDocument, NormalizedRecord, Partition};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const EMBED_BATCH_SIZE: usize = 64;

/// Turns normalized records into embedded documents, one collection per partition,
/// and folds the partitions into a single queryable store.
pub struct StoreBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl StoreBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            batch_size: EMBED_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Split records into the four collections.
    ///
    /// Code records feed the chunk collection and, when a summary exists, the summary
    /// collection. Blank text never becomes a document.
    pub fn partition(records: Vec<NormalizedRecord>) -> HashMap<Partition, Vec<EmbeddedDocument>> {
        let mut partitions: HashMap<Partition, Vec<EmbeddedDocument>> = HashMap::new();
        let mut push = |partition: Partition, text: String, record: &NormalizedRecord| {
            if text.trim().is_empty() {
                return;
            }
            let metadata = match partition {
                Partition::CodeSummary => crate::types::DocumentMetadata {
                    chunk: None,
                    ..record.metadata.clone()
                },
                _ => record.metadata.clone(),
            };
            partitions.entry(partition).or_default().push(EmbeddedDocument {
                id: document_id(&metadata.path, partition, metadata.chunk),
                text,
                partition,
                metadata,
            });
        };

        for record in &records {
            match record.category {
                Category::Code => {
                    if let Some(summary) = &record.summary {
                        push(Partition::CodeSummary, summary.clone(), record);
                    }
                    push(Partition::CodeChunk, record.content.clone(), record);
                }
                Category::Image => push(Partition::ImageCaption, record.content.clone(), record),
                Category::Text => push(Partition::PlainText, record.content.clone(), record),
            }
        }
        partitions
    }

    /// Embed one collection into its own store.
    pub async fn build_partition(&self, docs: Vec<EmbeddedDocument>) -> Result<VectorStore> {
        let mut store = VectorStore::new(self.dimensions());
        for batch in docs.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .context("Failed to embed documents")?;
            store.add(batch.to_vec(), vectors)?;
        }
        Ok(store)
    }

    /// Build every partition and merge them into one store.
    pub async fn build(&self, records: Vec<NormalizedRecord>) -> Result<VectorStore> {
        let mut partitions = Self::partition(records);
        let mut stores = Vec::new();
        for partition in Partition::ALL {
            if let Some(docs) = partitions.remove(&partition) {
                debug!(partition = partition.as_str(), count = docs.len(), "Embedding partition");
                stores.push(self.build_partition(docs).await?);
            }
        }
        merge_all(self.dimensions(), stores)
    }
}

/// Fold stores left to right into a fresh store of `dimensions`.
pub fn merge_all(dimensions: usize, stores: impl IntoIterator<Item = VectorStore>) -> Result<VectorStore> {
    let mut merged = VectorStore::new(dimensions);
    for store in stores {
        merged.merge_from(store)?;
    }
    Ok(merged)
}

/// Stable id for one logical slot: same path, partition and chunk always map to the same id.
pub fn document_id(path: &str, partition: Partition, chunk: Option<usize>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([0]);
    hasher.update(partition.as_str().as_bytes());
    hasher.update([0]);
    match chunk {
        Some(i) => hasher.update(i.to_string().as_bytes()),
        None => hasher.update(b"-"),
    }
    format!("{:x}", hasher.finalize())
}
