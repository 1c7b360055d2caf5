use super::{call_service, chunk_records, file_metadata, read_text, ContentTransformer, TransformConfig};
use crate::chunk::TextChunker;
use crate::classify::classify;
use crate::error::ProcessingError;
use crate::llm::{GenerateConfig, LLMProvider, Message};
use crate::types::{Category, NormalizedRecord};
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Summarizes source files with an LLM and chunks them into the code collection.
pub struct CodeTransformer {
    summarizer: Arc<dyn LLMProvider>,
    chunker: TextChunker,
    token_budget: usize,
    timeout: Duration,
    model: String,
    bpe: CoreBPE,
}

impl CodeTransformer {
    pub fn new(summarizer: Arc<dyn LLMProvider>, config: &TransformConfig) -> anyhow::Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().context("Failed to load cl100k_base tokenizer")?;
        Ok(Self {
            summarizer,
            chunker: config.chunker,
            token_budget: config.summary_token_budget,
            timeout: config.service_timeout,
            model: config.summary_model.clone(),
            bpe,
        })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Large files are left without a summary to bound LLM cost; service failures are
    /// logged and also yield `None` so the file still lands in the code collection.
    async fn summarize(&self, path: &Path, label: &str, code: &str) -> Option<String> {
        let tokens = self.count_tokens(code);
        if tokens >= self.token_budget {
            debug!(path = %path.display(), tokens, budget = self.token_budget, "Skipping summary for large file");
            return None;
        }

        let prompt = summary_prompt(code);
        let config = GenerateConfig {
            model: self.model.clone(),
            temperature: 0.0,
            ..Default::default()
        };
        let messages = [Message::user(&prompt)];

        match call_service(
            "summarizer",
            self.timeout,
            self.summarizer.generate(&messages, &config),
        )
        .await
        {
            Ok(resp) if !resp.text.trim().is_empty() => {
                Some(format!("{} {}", label, resp.text.trim()))
            }
            Ok(_) => {
                warn!(path = %path.display(), "Summarizer returned empty text");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Summary unavailable, indexing without it");
                None
            }
        }
    }
}

pub fn summary_prompt(code: &str) -> String {
    format!("Summarize the purpose of the following code:\n```\n{}\n```", code)
}

#[async_trait]
impl ContentTransformer for CodeTransformer {
    fn name(&self) -> &str {
        "code"
    }

    fn can_handle(&self, path: &Path) -> bool {
        matches!(classify(path), Some(c) if c.category == Category::Code)
    }

    async fn process(&self, path: &Path) -> Result<Vec<NormalizedRecord>, ProcessingError> {
        let label = classify(path)
            .and_then(|c| c.language_label)
            .unwrap_or("Source code");
        let content = read_text(path).await?;
        let metadata = file_metadata(path, Category::Code, Some(label)).await?;

        let mut records = chunk_records(&self.chunker, &content, Category::Code, &metadata);
        if content.trim().is_empty() {
            return Ok(records);
        }
        if let Some(first) = records.first_mut() {
            first.summary = self.summarize(path, label, &content).await;
        }
        Ok(records)
    }
}
