//! Image captioning service client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CAPTION_URL: &str =
    "https://api-inference.huggingface.co/models/nlpconnect/vit-gpt2-image-captioning";

/// Produces candidate captions for raw image bytes, best first.
#[async_trait]
pub trait ImageCaptioner: Send + Sync {
    async fn caption(&self, image: &[u8]) -> Result<Vec<String>>;

    fn model_name(&self) -> &str;
}

/// Hugging Face inference endpoint for image-to-text models.
pub struct HuggingFaceCaptioner {
    client: Client,
    bearer_token: String,
    url: String,
}

impl HuggingFaceCaptioner {
    pub fn new(bearer_token: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            bearer_token: bearer_token.to_string(),
            url: DEFAULT_CAPTION_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

fn parse_captions(body: &str) -> Result<Vec<String>> {
    let items: Vec<GeneratedText> =
        serde_json::from_str(body).context("Failed to parse caption response")?;
    Ok(items.into_iter().map(|g| g.generated_text).collect())
}

#[async_trait]
impl ImageCaptioner for HuggingFaceCaptioner {
    async fn caption(&self, image: &[u8]) -> Result<Vec<String>> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.bearer_token)
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!("Caption API error ({}): {}", status, body));
        }
        parse_captions(&body)
    }

    fn model_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_captions() {
        let body = r#"[{"generated_text": "a dog on a couch"}, {"generated_text": "a cat"}]"#;
        assert_eq!(
            parse_captions(body).unwrap(),
            vec!["a dog on a couch".to_string(), "a cat".to_string()]
        );
    }

    #[test]
    fn test_parse_error_payload_fails() {
        let body = r#"{"error": "Model is currently loading"}"#;
        assert!(parse_captions(body).is_err());
    }

    #[test]
    fn test_model_name_from_url() {
        let captioner = HuggingFaceCaptioner::new("t", Duration::from_secs(1)).unwrap();
        assert_eq!(captioner.model_name(), "vit-gpt2-image-captioning");
    }
}
