use crate::metadata::IndexMetadata;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Decides whether a path needs (re)processing.
///
/// The rule is mtime-only: a path is stale when it was never recorded, or when its
/// current mtime is strictly greater than the recorded one. Content is never hashed,
/// so a touch without edits triggers reprocessing and an overwrite that preserves
/// mtime goes unnoticed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn needs_indexing(&self, path: &Path, metadata: &IndexMetadata) -> io::Result<bool> {
        let key = path.to_string_lossy();
        match metadata.recorded_mtime(&key) {
            None => Ok(true),
            Some(recorded) => Ok(current_mtime(path)? > recorded),
        }
    }
}

/// Modification time in fractional seconds since the Unix epoch.
pub fn current_mtime(path: &Path) -> io::Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(system_time_secs(modified))
}

pub(crate) fn system_time_secs(t: std::time::SystemTime) -> f64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}
