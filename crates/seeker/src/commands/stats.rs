use crate::config::Settings;
use anyhow::Result;
use seeker_engine::IndexMetadata;
use serde_json::json;

/// Reads persisted metadata only, so it needs no service credentials.
pub fn execute(settings: &Settings) -> Result<()> {
    let index_dir = settings.index_dir();
    let stats = match IndexMetadata::load(&index_dir)? {
        Some(metadata) => json!({
            "last_indexed": metadata.last_indexed,
            "total_files": metadata.total_files(),
            "index_version": metadata.version,
        }),
        None => json!({
            "last_indexed": null,
            "total_files": 0,
            "index_version": seeker_engine::INDEX_VERSION,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
