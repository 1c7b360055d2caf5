//! Query answering: filter validation, TTL cache, optional LLM routing and the engine itself.

pub mod cache;
pub mod engine;
pub mod filter;
pub mod routing;

pub use cache::QueryCache;
pub use engine::{QueryConfig, QueryEngine};
pub use filter::{cache_key, parse_date, SearchFilters};
pub use routing::{LlmRouter, QueryRouter, Route};
