use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Abstraction for text → vector embedding providers.
///
/// Must be deterministic for a given model: the same instance embeds documents at
/// index time and queries at search time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimensions(&self) -> usize;
}

/// OpenAI-compatible embedding provider (text-embedding-3-small, 1536 dims by default).
pub struct OpenAIEmbedding {
    client: Client,
    api_key: String,
    model: String,
    dims: usize,
    base_url: Option<String>,
}

impl OpenAIEmbedding {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: "text-embedding-3-small".to_string(),
            dims: 1536,
            base_url: None,
        })
    }

    pub fn with_model(mut self, model: &str, dims: usize) -> Self {
        self.model = model.to_string();
        self.dims = dims;
        self
    }

    /// Point at an OpenAI-compatible server (e.g. a local embedding service).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    fn api_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_EMBEDDINGS_URL)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .context("Empty embedding response")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let max_retries = 3u32;
        let mut attempt = 0;

        loop {
            let body = EmbeddingRequest {
                model: &self.model,
                input: texts,
            };

            let resp = self
                .client
                .post(self.api_url())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let data: EmbeddingResponse =
                        r.json().await.context("Failed to parse embedding response")?;
                    if data.data.len() != texts.len() {
                        anyhow::bail!(
                            "Embedding API returned {} vectors for {} inputs",
                            data.data.len(),
                            texts.len()
                        );
                    }
                    return Ok(data.data.into_iter().map(|d| d.embedding).collect());
                }
                Ok(r) => {
                    let status = r.status();
                    let text = r.text().await.unwrap_or_default();
                    if attempt < max_retries && (status.is_server_error() || status.as_u16() == 429) {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        warn!(attempt, %status, "Embedding API error, retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        anyhow::bail!("Embedding API error {}: {}", status, text);
                    }
                }
                Err(e) => {
                    if attempt < max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        warn!(attempt, error = %e, "Embedding request failed, retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        return Err(e).context("Embedding API request failed after retries");
                    }
                }
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Mock embedding provider for testing. Returns deterministic vectors.
#[cfg(test)]
pub struct MockEmbedding {
    dims: usize,
}

#[cfg(test)]
impl MockEmbedding {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[cfg(test)]
#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Deterministic hash-based vector for testing
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(text.as_bytes());
        let vec: Vec<f32> = (0..self.dims)
            .map(|i| {
                let byte = hash[i % 32] as f32;
                (byte / 255.0) * 2.0 - 1.0 // normalize to [-1, 1]
            })
            .collect();
        Ok(vec)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_is_deterministic() {
        let embedder = MockEmbedding::new(16);
        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("hello").await.unwrap();
        let c = embedder.embed("world").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_custom_base_url() {
        let embedder = OpenAIEmbedding::new("key", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/v1/embeddings")
            .with_model("all-minilm", 384);
        assert_eq!(embedder.api_url(), "http://localhost:8080/v1/embeddings");
        assert_eq!(embedder.dimensions(), 384);
    }
}
