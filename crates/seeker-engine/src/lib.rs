pub mod caption;
pub mod change;
pub mod chunk;
pub mod classify;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod llm;
pub mod metadata;
pub mod query;
pub mod store;
pub mod transform;
pub mod types;
pub mod watch;

pub use caption::{HuggingFaceCaptioner, ImageCaptioner};
pub use change::ChangeDetector;
pub use chunk::TextChunker;
pub use classify::classify;
pub use embedding::{EmbeddingProvider, OpenAIEmbedding};
pub use error::{IndexError, MetadataError, ProcessingError, QueryError, ServiceError};
pub use indexer::{Indexer, IndexerConfig, DEFAULT_EXCLUDED_DIRS};
pub use llm::{GenerateConfig, GenerateResponse, LLMProvider, Message, OpenAIClient, Role, Usage};
pub use metadata::{IndexMetadata, INDEX_VERSION, METADATA_FILE};
pub use query::{LlmRouter, QueryCache, QueryConfig, QueryEngine, QueryRouter, Route, SearchFilters};
pub use store::{StoreBuilder, VectorStore};
pub use transform::{ContentTransformer, TransformConfig, TransformerChain};
pub use types::{
    Category, Classification, DocumentMetadata, EmbeddedDocument, IndexStats, IndexedFile,
    NormalizedRecord, Partition, SearchResult,
};
pub use watch::{watch, IndexWatcher};

/// Initialize structured JSON logging.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` or `info` depending on `debug`.
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_logging(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
