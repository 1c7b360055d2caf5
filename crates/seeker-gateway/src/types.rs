use chrono::{DateTime, Utc};
use seeker_engine::{IndexStats, SearchResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Search request body
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
}

/// Ranked search hits
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// Reindex outcome
#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub stats: IndexStats,
}

/// Index statistics. `last_indexed` is null until the first run has been persisted.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub last_indexed: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub index_version: String,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}
