use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use seeker_engine::{IndexError, Indexer, QueryEngine, QueryError, METADATA_FILE};
use serde_json::Map;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::types::*;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub indexer: Arc<Indexer>,
    pub query: Arc<QueryEngine>,
}

impl AppState {
    pub fn new(indexer: Arc<Indexer>, query: Arc<QueryEngine>) -> Self {
        Self { indexer, query }
    }
}

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", post(search))
        .route("/reindex", post(reindex))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway server
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!(addr = %addr, "Starting search server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Search server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn query_error(e: QueryError) -> ApiError {
    let status = match &e {
        QueryError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
        QueryError::StoreNotLoaded | QueryError::StoreLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        QueryError::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %e, "Search failed");
    }
    api_error(status, e.to_string())
}

// --- REST Handlers ---

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(req) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let query = match req.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'query'")),
    };
    let filters = req.filters.unwrap_or_else(Map::new);

    let results = state
        .query
        .search(&query, &filters)
        .await
        .map_err(query_error)?;
    Ok(Json(SearchResponse { results }))
}

async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexResponse>, ApiError> {
    let stats = match state.indexer.index().await {
        Ok(stats) => stats,
        Err(IndexError::AlreadyRunning) => {
            return Err(api_error(StatusCode::CONFLICT, IndexError::AlreadyRunning.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Reindex failed");
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if let Err(e) = state.query.load_from_disk(state.indexer.index_dir()).await {
        error!(error = %e, "Failed to reload store after reindex");
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    Ok(Json(ReindexResponse {
        status: "success".to_string(),
        timestamp: Utc::now(),
        stats,
    }))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let metadata = state.indexer.metadata().await;
    let persisted = state.indexer.index_dir().join(METADATA_FILE).is_file();

    Json(StatsResponse {
        last_indexed: persisted.then_some(metadata.last_indexed),
        total_files: metadata.total_files(),
        index_version: metadata.version,
    })
}
