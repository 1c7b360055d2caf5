use crate::llm::{GenerateConfig, LLMProvider, Message};
use crate::transform::call_service;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How a query should be answered.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Image-seeking query, rewritten to look more like a caption.
    Image { rewritten: String },
    Vanilla,
}

/// Optional strategy consulted before retrieval. Errors make the engine fall back to vanilla search.
#[async_trait]
pub trait QueryRouter: Send + Sync {
    async fn route(&self, query: &str) -> Result<Route>;
}

pub fn image_intent_prompt(query: &str) -> String {
    format!(
        "If the following query is looking for an image, output the word Image. \
         If you are not sure or do not think the query is looking for an image, \
         output the word Other.\n\nQuery: {}.\nOutput: ",
        query
    )
}

pub fn generalize_prompt(query: &str) -> String {
    format!(
        "This is a query for a database of image captions. Generalize the query so it is \
         more applicable to pictures that it might be similar to. For example:\n\n\
         Query: Jack and Jill posing for a honeymoon picture in the Bahamas.\n\
         Generalized: A man and a woman standing on a beach.\n\
         Query: {}\nGeneralized:",
        query
    )
}

/// Routes through the summarization LLM: one call to detect image intent, a second to
/// generalize the query when it does.
pub struct LlmRouter {
    llm: Arc<dyn LLMProvider>,
    model: String,
    timeout: Duration,
}

impl LlmRouter {
    pub fn new(llm: Arc<dyn LLMProvider>, timeout: Duration) -> Self {
        Self {
            llm,
            model: String::new(),
            timeout,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        let config = GenerateConfig {
            model: self.model.clone(),
            max_tokens: 256,
            temperature: 0.0,
            ..Default::default()
        };
        let messages = [Message::user(prompt)];
        let response = call_service("router", self.timeout, self.llm.generate(&messages, &config)).await?;
        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl QueryRouter for LlmRouter {
    async fn route(&self, query: &str) -> Result<Route> {
        let verdict = self.ask(&image_intent_prompt(query)).await?;
        debug!(verdict = %verdict, "Router verdict");
        if !verdict.contains("Image") {
            return Ok(Route::Vanilla);
        }

        let generalized = self.ask(&generalize_prompt(query)).await?;
        if generalized.is_empty() {
            return Ok(Route::Image {
                rewritten: query.to_string(),
            });
        }
        Ok(Route::Image {
            rewritten: format!("{}, which is {}", query, generalized),
        })
    }
}
