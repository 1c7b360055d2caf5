use anyhow::Result;
use async_trait::async_trait;

use super::types::{GenerateConfig, GenerateResponse, Message};

/// Text generation service used for code summaries and query routing.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a single completion (non-streaming)
    async fn generate(
        &self,
        messages: &[Message],
        config: &GenerateConfig,
    ) -> Result<GenerateResponse>;

    /// Provider model name for logging/tracking
    fn model_name(&self) -> &str;
}
