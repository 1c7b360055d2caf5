use crate::config::Settings;
use crate::services;
use anyhow::Result;
use seeker_gateway::{start_server, AppState};
use std::time::Duration;
use tracing::{info, warn};

const WATCH_DEBOUNCE: Duration = Duration::from_secs(2);

pub async fn execute(settings: &Settings, host: Option<String>, port: Option<u16>, watch: bool) -> Result<()> {
    let services = services::build(settings)?;
    let index_dir = services.indexer.index_dir().to_path_buf();

    match services.query.load_from_disk(&index_dir).await {
        Ok(()) => info!(dir = %index_dir.display(), "Serving existing index"),
        Err(e) => warn!(error = %e, "No usable index yet, search returns 503 until /reindex"),
    }

    let _watcher = if watch {
        let query = services.query.clone();
        let dir = index_dir.clone();
        Some(seeker_engine::watch(
            services.indexer.clone(),
            WATCH_DEBOUNCE,
            move |stats| {
                let query = query.clone();
                let dir = dir.clone();
                async move {
                    info!(indexed = stats.files_indexed, removed = stats.files_removed, "Reloading after change");
                    if let Err(e) = query.load_from_disk(&dir).await {
                        warn!(error = %e, "Failed to reload store");
                    }
                }
            },
        )?)
    } else {
        None
    };

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let state = AppState::new(services.indexer, services.query);

    start_server(state, &host, port).await?;

    Ok(())
}
