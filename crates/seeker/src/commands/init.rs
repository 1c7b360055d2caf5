use anyhow::Result;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# Seeker Configuration
# Every value can also be overridden from the environment (see names in brackets).

[server]
host = "127.0.0.1"   # [API_HOST]
port = 8686          # [API_PORT]
debug = false        # [DEBUG_MODE]

[index]
root = "."                      # [ROOT_PATH]
index_dir = "~/.seeker/index"   # [INDEX_DIR]
chunk_size = 1000               # [CHUNK_SIZE]
chunk_overlap = 200             # [CHUNK_OVERLAP]
excluded_dirs = [".git", "node_modules", "__pycache__", "venv", "env", ".env", "build", "dist"]  # [EXCLUDED_DIRS]
max_concurrency = 4
summary_token_budget = 5000

[search]
max_results = 10             # [MAX_RESULTS]
similarity_threshold = 0.7   # [SIMILARITY_THRESHOLD]
enable_cache = true          # [ENABLE_CACHE]
cache_ttl_secs = 3600        # [CACHE_TTL]
llm_routing = false          # [LLM_ROUTING]

[services]
# openai_base_url = "https://api.openai.com/v1"   # [OPENAI_BASE_URL]
# API keys are best left to OPENAI_API_KEY and HF_BEARER_TOKEN
embedding_model = "text-embedding-3-small"
embedding_dimensions = 1536
summary_model = "gpt-3.5-turbo"
caption_url = "https://api-inference.huggingface.co/models/nlpconnect/vit-gpt2-image-captioning"
timeout_secs = 60
"#;

/// Initialize a new config file
pub fn run_init(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config already exists at {:?}", path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    println!("Created config at {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, Settings};

    #[test]
    fn test_default_config_matches_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seeker.toml");
        run_init(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        let defaults = Settings::default();
        assert_eq!(loaded.server.port, defaults.server.port);
        assert_eq!(loaded.index.index_dir, defaults.index.index_dir);
        assert_eq!(loaded.index.excluded_dirs, defaults.index.excluded_dirs);
        assert_eq!(loaded.services.caption_url, defaults.services.caption_url);
        assert!(run_init(&path).is_err());
    }
}
