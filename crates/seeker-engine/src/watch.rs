use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, Watcher};
use notify_debouncer_mini::{
    new_debouncer, DebounceEventResult, DebouncedEvent, DebouncedEventKind, Debouncer,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::IndexError;
use crate::indexer::Indexer;
use crate::types::IndexStats;

/// Keeps the root under watch; dropping it stops the watcher and its task.
pub struct IndexWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl IndexWatcher {
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for IndexWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reindex whenever files under the root settle after a change.
///
/// Events inside the index directory are ignored so persisting the index does not retrigger
/// it. `on_indexed` runs after each successful pass, typically to reload the query engine.
pub fn watch<F, Fut>(indexer: Arc<Indexer>, debounce: Duration, on_indexed: F) -> Result<IndexWatcher>
where
    F: Fn(IndexStats) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    let index_dir = indexer.index_dir().to_path_buf();

    let mut debouncer = new_debouncer(
        debounce,
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                if events.iter().any(|e| is_relevant(e, &index_dir)) {
                    let _ = tx.send(());
                }
            }
            Err(e) => error!("File watcher error: {:?}", e),
        },
    )
    .context("Failed to create file watcher")?;

    debouncer
        .watcher()
        .watch(indexer.root(), notify::RecursiveMode::Recursive)
        .context("Failed to watch root directory")?;

    info!(root = %indexer.root().display(), "Watching for changes");

    let task = tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Collapse a burst of notifications into one pass
            while rx.try_recv().is_ok() {}

            match indexer.index().await {
                Ok(stats) => {
                    debug!(indexed = stats.files_indexed, removed = stats.files_removed, "Watch-triggered index finished");
                    on_indexed(stats).await;
                }
                Err(IndexError::AlreadyRunning) => {
                    debug!("Index already running, skipping watch trigger");
                }
                Err(e) => warn!(error = %e, "Watch-triggered index failed"),
            }
        }
    });

    Ok(IndexWatcher {
        _debouncer: debouncer,
        task,
    })
}

fn is_relevant(event: &DebouncedEvent, index_dir: &Path) -> bool {
    event.kind == DebouncedEventKind::Any && !event.path.starts_with(index_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn event(path: &str, kind: DebouncedEventKind) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn test_index_dir_events_ignored() {
        let index_dir = Path::new("/data/.seeker");
        assert!(!is_relevant(&event("/data/.seeker/store.db", DebouncedEventKind::Any), index_dir));
        assert!(is_relevant(&event("/data/notes.txt", DebouncedEventKind::Any), index_dir));
        assert!(!is_relevant(&event("/data/notes.txt", DebouncedEventKind::AnyContinuous), index_dir));
    }
}
