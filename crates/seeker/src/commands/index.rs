use crate::config::Settings;
use crate::services;
use anyhow::Result;
use tracing::info;

pub async fn execute(settings: &Settings) -> Result<()> {
    let services = services::build(settings)?;
    info!(root = %services.indexer.root().display(), "Indexing");

    let stats = services.indexer.index().await?;
    for file in &stats.indexed {
        eprintln!("indexed: {} [{}]", file.path, file.category.as_str());
    }
    for path in &stats.failed {
        eprintln!("failed: {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
