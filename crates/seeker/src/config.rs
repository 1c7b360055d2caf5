use anyhow::{bail, Context, Result};
use seeker_engine::caption::DEFAULT_CAPTION_URL;
use seeker_engine::DEFAULT_EXCLUDED_DIRS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_root")]
    pub root: String,

    #[serde(default = "default_index_dir")]
    pub index_dir: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_summary_token_budget")]
    pub summary_token_budget: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_true")]
    pub enable_cache: bool,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub llm_routing: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServicesConfig {
    /// Root of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`
    #[serde(default)]
    pub openai_base_url: Option<String>,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    #[serde(default = "default_caption_url")]
    pub caption_url: String,

    #[serde(default)]
    pub hf_bearer_token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8686
}

fn default_root() -> String {
    ".".to_string()
}

fn default_index_dir() -> String {
    "~/.seeker/index".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_excluded_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_summary_token_budget() -> usize {
    5000
}

fn default_max_results() -> usize {
    10
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_summary_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_caption_url() -> String {
    DEFAULT_CAPTION_URL.to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            index_dir: default_index_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            excluded_dirs: default_excluded_dirs(),
            max_concurrency: default_max_concurrency(),
            summary_token_budget: default_summary_token_budget(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            similarity_threshold: default_similarity_threshold(),
            enable_cache: true,
            cache_ttl_secs: default_cache_ttl(),
            llm_routing: false,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            openai_base_url: None,
            openai_api_key: None,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            summary_model: default_summary_model(),
            caption_url: default_caption_url(),
            hf_bearer_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Settings {
    /// Load from file (or defaults), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = load_config(path)?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Override fields from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("API_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("API_PORT") {
            self.server.port = parse_env("API_PORT", &v)?;
        }
        if let Some(v) = var("DEBUG_MODE") {
            self.server.debug = parse_bool("DEBUG_MODE", &v)?;
        }
        if let Some(v) = var("ROOT_PATH") {
            self.index.root = v;
        }
        if let Some(v) = var("INDEX_DIR") {
            self.index.index_dir = v;
        }
        if let Some(v) = var("CHUNK_SIZE") {
            self.index.chunk_size = parse_env("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = var("CHUNK_OVERLAP") {
            self.index.chunk_overlap = parse_env("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = var("EXCLUDED_DIRS") {
            self.index.excluded_dirs = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = var("MAX_RESULTS") {
            self.search.max_results = parse_env("MAX_RESULTS", &v)?;
        }
        if let Some(v) = var("SIMILARITY_THRESHOLD") {
            self.search.similarity_threshold = parse_env("SIMILARITY_THRESHOLD", &v)?;
        }
        if let Some(v) = var("ENABLE_CACHE") {
            self.search.enable_cache = parse_bool("ENABLE_CACHE", &v)?;
        }
        if let Some(v) = var("CACHE_TTL") {
            self.search.cache_ttl_secs = parse_env("CACHE_TTL", &v)?;
        }
        if let Some(v) = var("LLM_ROUTING") {
            self.search.llm_routing = parse_bool("LLM_ROUTING", &v)?;
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.services.openai_api_key = Some(v);
        }
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.services.openai_base_url = Some(v);
        }
        if let Some(v) = var("HF_BEARER_TOKEN") {
            self.services.hf_bearer_token = Some(v);
        }
        Ok(())
    }

    pub fn root_path(&self) -> PathBuf {
        expand(&self.index.root)
    }

    pub fn index_dir(&self) -> PathBuf {
        expand(&self.index.index_dir)
    }

    /// Hard errors fail; missing credentials are only reported, since `stats` and `init`
    /// work without them.
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.index.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.index.chunk_overlap,
                self.index.chunk_size
            );
        }
        if !(-1.0..=1.0).contains(&self.search.similarity_threshold) {
            bail!(
                "similarity_threshold must be between -1 and 1, got {}",
                self.search.similarity_threshold
            );
        }
        if self.services.embedding_dimensions == 0 {
            bail!("embedding_dimensions must be greater than zero");
        }

        let mut warnings = Vec::new();
        if self.services.openai_api_key.is_none() {
            warnings.push(
                "OPENAI_API_KEY is not set: embedding and code summaries will fail".to_string(),
            );
        }
        if self.services.hf_bearer_token.is_none() {
            warnings.push("HF_BEARER_TOKEN is not set: images will fail to caption".to_string());
        }
        if self.index.max_concurrency == 0 {
            warnings.push("max_concurrency is 0, using 1".to_string());
        }
        Ok(warnings)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", key, value, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Invalid {}={:?}: expected a boolean", key, value),
    }
}

/// Load config from file or use defaults
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    if let Some(path) = path {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;

        let settings: Settings = toml::from_str(&content).context("Failed to parse TOML config")?;

        Ok(settings)
    } else {
        Ok(Settings::default())
    }
}
