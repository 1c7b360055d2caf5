use crate::config::Settings;
use crate::services;
use anyhow::{Context, Result};
use serde_json::{Map, Value};

pub async fn execute(settings: &Settings, query: &str, filters: Option<&str>, json: bool) -> Result<()> {
    let filters: Map<String, Value> = match filters {
        Some(raw) => serde_json::from_str(raw).context("--filters must be a JSON object")?,
        None => Map::new(),
    };

    let services = services::build(settings)?;
    services
        .query
        .load_from_disk(services.indexer.index_dir())
        .await
        .context("No index found, run `seeker index` first")?;

    let results = services.query.search(query, &filters).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results");
    }
    for result in &results {
        println!("{:.3}  {}", result.score, result.path);
    }
    Ok(())
}
