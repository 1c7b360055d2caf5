use crate::error::MetadataError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";
pub const INDEX_VERSION: &str = "1.0.0";

/// Durable record of indexing state: what was indexed, when, and at which mtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub root: PathBuf,
    pub last_indexed: DateTime<Utc>,
    /// Absolute path -> mtime (seconds since epoch) at the time it was processed
    pub indexed_files: BTreeMap<String, f64>,
    pub version: String,
}

impl IndexMetadata {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            last_indexed: Utc::now(),
            indexed_files: BTreeMap::new(),
            version: INDEX_VERSION.to_string(),
        }
    }

    pub fn total_files(&self) -> usize {
        self.indexed_files.len()
    }

    pub fn recorded_mtime(&self, path: &str) -> Option<f64> {
        self.indexed_files.get(path).copied()
    }

    /// Read `metadata.json` from `dir`. `Ok(None)` when no file exists yet.
    pub fn load(dir: &Path) -> Result<Option<Self>, MetadataError> {
        let path = dir.join(METADATA_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata: IndexMetadata = serde_json::from_str(&raw)?;
        if metadata.version != INDEX_VERSION {
            return Err(MetadataError::VersionMismatch {
                found: metadata.version,
                expected: INDEX_VERSION.to_string(),
            });
        }
        Ok(Some(metadata))
    }

    /// Write `metadata.json` atomically: temp file in the same directory, then rename.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index dir {:?}", dir))?;

        let json = serde_json::to_string_pretty(self).context("Failed to serialize metadata")?;
        let tmp = dir.join(format!(".{}.{}.tmp", METADATA_FILE, uuid::Uuid::new_v4()));
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;

        let target = dir.join(METADATA_FILE);
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to replace {:?}", target));
        }
        Ok(())
    }
}
