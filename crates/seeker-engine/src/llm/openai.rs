use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::provider::LLMProvider;
use super::types::*;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI Chat Completions API client
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    /// Custom base URL for OpenAI-compatible APIs (e.g., local LLM)
    base_url: Option<String>,
}

impl OpenAIClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    fn api_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build OpenAI API request body
    fn build_request_body(&self, messages: &[Message], config: &GenerateConfig) -> Value {
        let model = if config.model.is_empty() {
            &self.model
        } else {
            &config.model
        };

        let mut api_msgs = Vec::with_capacity(messages.len() + 1);
        if let Some(ref sys) = config.system_prompt {
            api_msgs.push(json!({"role": "system", "content": sys}));
        }
        for msg in messages {
            api_msgs.push(json!({"role": msg.role, "content": msg.content}));
        }

        json!({
            "model": model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": api_msgs,
        })
    }

    /// Parse OpenAI API response
    fn parse_response(&self, body: &ApiResponse) -> Result<GenerateResponse> {
        let choice = body
            .choices
            .first()
            .ok_or_else(|| anyhow!("No choices in OpenAI response"))?;

        let text = choice.message.content.clone().unwrap_or_default();

        let usage = body
            .usage
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(GenerateResponse {
            text,
            usage,
            model: body.model.clone(),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(
        &self,
        messages: &[Message],
        config: &GenerateConfig,
    ) -> Result<GenerateResponse> {
        let body = self.build_request_body(messages, config);

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_body));
        }

        let api_response: ApiResponse = response.json().await?;
        self.parse_response(&api_response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI API response structures
#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAIClient {
        OpenAIClient::new("test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_request_body() {
        let messages = vec![Message::user("Hello")];
        let config = GenerateConfig {
            system_prompt: Some("Be helpful".into()),
            ..Default::default()
        };

        let body = client().build_request_body(&messages, &config);

        // System prompt is first message
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_config_model_overrides_client_model() {
        let config = GenerateConfig {
            model: "gpt-4o-mini".into(),
            ..Default::default()
        };
        let body = client().build_request_body(&[Message::user("hi")], &config);
        assert_eq!(body["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_parse_response_text() {
        let api_resp = ApiResponse {
            model: "gpt-3.5-turbo".into(),
            choices: vec![Choice {
                message: ApiMessage {
                    content: Some("Hello!".into()),
                },
            }],
            usage: Some(ApiUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            }),
        };

        let resp = client().parse_response(&api_resp).unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.usage.input_tokens, 10);
        assert_eq!(resp.usage.output_tokens, 5);
    }

    #[test]
    fn test_parse_response_without_choices_fails() {
        let api_resp = ApiResponse {
            model: "gpt-3.5-turbo".into(),
            choices: vec![],
            usage: None,
        };
        assert!(client().parse_response(&api_resp).is_err());
    }

    #[test]
    fn test_custom_base_url() {
        let client = client().with_base_url("http://localhost:11434/v1/chat/completions");
        assert_eq!(client.api_url(), "http://localhost:11434/v1/chat/completions");
    }
}
