use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Coarse content category of a file. The serialized form doubles as the `file_type` filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Image,
    Text,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Image => "image",
            Category::Text => "text",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a path by extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// Human-readable source language, only set for code.
    pub language_label: Option<&'static str>,
}

/// A file the pipeline processed successfully in one run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedFile {
    pub path: String,
    pub category: Category,
    pub language_label: Option<String>,
    /// Seconds since the Unix epoch, as recorded in `indexed_files`.
    pub mtime: f64,
    pub size: u64,
}

/// Metadata attached to every stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub path: String,
    pub file_type: Category,
    pub size: u64,
    pub modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<usize>,
}

/// Transformer output, consumed immediately by the store builder.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub content: String,
    pub summary: Option<String>,
    pub category: Category,
    pub metadata: DocumentMetadata,
}

/// Which collection a document belongs to before the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    CodeSummary,
    CodeChunk,
    ImageCaption,
    PlainText,
}

impl Partition {
    pub const ALL: [Partition; 4] = [
        Partition::CodeSummary,
        Partition::CodeChunk,
        Partition::ImageCaption,
        Partition::PlainText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::CodeSummary => "code_summary",
            Partition::CodeChunk => "code_chunk",
            Partition::ImageCaption => "image_caption",
            Partition::PlainText => "plain_text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

/// A document held by the vector store. The vector itself lives alongside it in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDocument {
    pub id: String,
    pub text: String,
    pub partition: Partition,
    pub metadata: DocumentMetadata,
}

/// A single ranked hit returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub score: f32,
    pub metadata: DocumentMetadata,
}

/// Statistics returned after an indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_removed: usize,
    pub documents_added: usize,
    pub errors: usize,
    #[serde(skip)]
    pub indexed: Vec<IndexedFile>,
    #[serde(skip)]
    pub failed: Vec<PathBuf>,
}
