use crate::change::{current_mtime, ChangeDetector};
use crate::classify::classify;
use crate::error::{IndexError, ProcessingError};
use crate::metadata::IndexMetadata;
use crate::store::{StoreBuilder, VectorStore, STORE_FILE};
use crate::transform::TransformerChain;
use crate::types::{Category, IndexStats, IndexedFile, NormalizedRecord};
use anyhow::anyhow;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    "env",
    ".env",
    "build",
    "dist",
];

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    /// Any path (relative to root) containing one of these as a substring is skipped
    pub excluded_dirs: Vec<String>,
    pub max_concurrency: usize,
}

impl IndexerConfig {
    pub fn new(root: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_dir: index_dir.into(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            max_concurrency: 4,
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if path.starts_with(&self.index_dir) {
            return true;
        }
        let rel = path.strip_prefix(&self.root).unwrap_or(path).to_string_lossy();
        self.excluded_dirs
            .iter()
            .any(|dir| !dir.is_empty() && rel.contains(dir.as_str()))
    }
}

struct IndexState {
    metadata: IndexMetadata,
    store: Arc<VectorStore>,
}

/// A file that passed change detection, with the mtime observed before processing.
struct Pending {
    path: PathBuf,
    mtime: f64,
}

/// Walks the root, transforms changed files and maintains the persisted store and metadata.
pub struct Indexer {
    config: IndexerConfig,
    chain: TransformerChain,
    builder: StoreBuilder,
    detector: ChangeDetector,
    state: RwLock<IndexState>,
    run_lock: Mutex<()>,
}

impl Indexer {
    /// Restore persisted state from `index_dir`, starting fresh whenever it cannot be trusted.
    pub fn open(mut config: IndexerConfig, chain: TransformerChain, builder: StoreBuilder) -> Self {
        config.root = std::fs::canonicalize(&config.root).unwrap_or(config.root);
        if let Err(e) = std::fs::create_dir_all(&config.index_dir) {
            warn!(dir = %config.index_dir.display(), error = %e, "Failed to create index dir");
        }
        if let Ok(dir) = std::fs::canonicalize(&config.index_dir) {
            config.index_dir = dir;
        }
        let state = load_state(&config, builder.dimensions());

        Self {
            config,
            chain,
            builder,
            detector: ChangeDetector::new(),
            state: RwLock::new(state),
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn index_dir(&self) -> &Path {
        &self.config.index_dir
    }

    pub async fn metadata(&self) -> IndexMetadata {
        self.state.read().await.metadata.clone()
    }

    pub async fn store(&self) -> Arc<VectorStore> {
        self.state.read().await.store.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run one incremental indexing pass and persist the result.
    pub async fn index(&self) -> Result<IndexStats, IndexError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| IndexError::AlreadyRunning)?;

        let (metadata, store) = {
            let state = self.state.read().await;
            (state.metadata.clone(), state.store.clone())
        };

        let mut stats = IndexStats::default();
        let mut seen = HashSet::new();
        let pending = self.scan(&metadata, &mut stats, &mut seen)?;
        info!(
            root = %self.config.root.display(),
            seen = stats.files_seen,
            pending = pending.len(),
            "Indexing started"
        );

        let chain = &self.chain;
        let outcomes: Vec<(Pending, Result<Vec<NormalizedRecord>, ProcessingError>)> =
            stream::iter(pending.into_iter().map(|item| async move {
                let result = match chain.select(&item.path) {
                    Some(transformer) => {
                        debug!(path = %item.path.display(), transformer = transformer.name(), "Processing file");
                        transformer.process(&item.path).await
                    }
                    None => Err(ProcessingError::new(
                        &item.path,
                        anyhow!("no transformer accepts this file"),
                    )),
                };
                (item, result)
            }))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut records = Vec::new();
        let mut processed = Vec::new();
        for (item, result) in outcomes {
            match result {
                Ok(mut file_records) => {
                    let key = item.path.to_string_lossy().to_string();
                    let file = IndexedFile {
                        path: key.clone(),
                        category: file_records
                            .first()
                            .map(|r| r.category)
                            .or_else(|| classify(&item.path).map(|c| c.category))
                            .unwrap_or(Category::Text),
                        language_label: file_records.first().and_then(|r| r.metadata.language.clone()),
                        mtime: item.mtime,
                        size: file_records.first().map(|r| r.metadata.size).unwrap_or(0),
                    };
                    records.append(&mut file_records);
                    processed.push(file);
                }
                Err(e) => {
                    warn!(path = %e.path.display(), error = %e.source, "Failed to process file");
                    stats.errors += 1;
                    stats.failed.push(e.path);
                }
            }
        }

        // Prune only what the walk did not see and is really gone. Keys are lossy for
        // non-UTF-8 names, so they cannot be checked with `exists` alone.
        let removed: Vec<String> = metadata
            .indexed_files
            .keys()
            .filter(|p| !seen.contains(p.as_str()) && !Path::new(p.as_str()).exists())
            .cloned()
            .collect();
        stats.files_removed = removed.len();

        let built = self
            .builder
            .build(records)
            .await
            .map_err(IndexError::Store)?;
        stats.documents_added = built.len();

        // A file is indexed only if it left at least one document behind
        let (indexed, emptied): (Vec<IndexedFile>, Vec<IndexedFile>) = {
            let built_paths = built.paths();
            processed
                .into_iter()
                .partition(|f| built_paths.contains(f.path.as_str()))
        };
        for file in &emptied {
            debug!(path = %file.path, "File produced no documents, not recorded");
        }
        stats.files_indexed = indexed.len();

        let changed = !indexed.is_empty() || !emptied.is_empty() || !removed.is_empty();
        let next_store = if changed {
            let mut next = (*store).clone();
            let stale = removed
                .iter()
                .chain(indexed.iter().chain(emptied.iter()).map(|f| &f.path));
            for path in stale {
                let dropped = next.remove_path(path);
                if dropped > 0 {
                    debug!(path = %path, documents = dropped, "Dropped stale documents");
                }
            }
            next.merge_from(built).map_err(IndexError::Store)?;
            Arc::new(next)
        } else {
            store
        };

        let mut next_metadata = metadata;
        for path in &removed {
            next_metadata.indexed_files.remove(path);
            debug!(path = %path, "Pruned deleted file");
        }
        for file in &emptied {
            next_metadata.indexed_files.remove(&file.path);
        }
        for file in &indexed {
            next_metadata.indexed_files.insert(file.path.clone(), file.mtime);
        }
        stats.indexed = indexed;
        next_metadata.last_indexed = Utc::now();

        if changed || !self.config.index_dir.join(STORE_FILE).exists() {
            next_store
                .save(&self.config.index_dir)
                .map_err(IndexError::Persist)?;
        }
        next_metadata
            .save(&self.config.index_dir)
            .map_err(IndexError::Persist)?;

        {
            let mut state = self.state.write().await;
            state.metadata = next_metadata;
            state.store = next_store;
        }

        info!(
            indexed = stats.files_indexed,
            skipped = stats.files_skipped,
            removed = stats.files_removed,
            documents = stats.documents_added,
            errors = stats.errors,
            "Indexing complete"
        );
        Ok(stats)
    }

    /// Walk the root and collect files whose mtime moved past the recorded value.
    /// Every classified file reached is added to `seen` under its metadata key.
    fn scan(
        &self,
        metadata: &IndexMetadata,
        stats: &mut IndexStats,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<Pending>, IndexError> {
        let mut pending = Vec::new();
        let walker = WalkDir::new(&self.config.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.config.is_excluded(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(IndexError::Walk {
                        root: self.config.root.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    stats.errors += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if classify(path).is_none() {
                continue;
            }
            stats.files_seen += 1;
            seen.insert(path.to_string_lossy().to_string());

            match self.detector.needs_indexing(path, metadata) {
                Ok(false) => stats.files_skipped += 1,
                Ok(true) => match current_mtime(path) {
                    Ok(mtime) => pending.push(Pending {
                        path: path.to_path_buf(),
                        mtime,
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to read mtime");
                        stats.errors += 1;
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to check for changes");
                    stats.errors += 1;
                }
            }
        }
        Ok(pending)
    }
}

fn load_state(config: &IndexerConfig, dimensions: usize) -> IndexState {
    let fresh = || IndexState {
        metadata: IndexMetadata::new(&config.root),
        store: Arc::new(VectorStore::new(dimensions)),
    };

    let metadata = match IndexMetadata::load(&config.index_dir) {
        Ok(Some(metadata)) if metadata.root == config.root => metadata,
        Ok(Some(metadata)) => {
            warn!(
                recorded = %metadata.root.display(),
                root = %config.root.display(),
                "Index was built for a different root, starting fresh"
            );
            return fresh();
        }
        Ok(None) => return fresh(),
        Err(e) => {
            warn!(error = %e, "Ignoring unusable index metadata, starting fresh");
            return fresh();
        }
    };

    match VectorStore::load(&config.index_dir) {
        Ok(store) if store.is_empty() || store.dimensions() == dimensions => {
            info!(
                files = metadata.total_files(),
                documents = store.len(),
                "Loaded existing index"
            );
            IndexState {
                metadata,
                store: Arc::new(store),
            }
        }
        Ok(store) => {
            warn!(
                stored = store.dimensions(),
                expected = dimensions,
                "Stored embeddings have different dimensions, starting fresh"
            );
            fresh()
        }
        Err(e) => {
            warn!(error = %e, "Failed to load vector store, starting fresh");
            fresh()
        }
    }
}
