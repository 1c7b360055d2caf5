use super::{call_service, file_metadata, ContentTransformer};
use crate::caption::ImageCaptioner;
use crate::classify::classify;
use crate::error::{ProcessingError, ServiceError};
use crate::types::{Category, NormalizedRecord};
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const CAPTION_PREFIX: &str = "A picture of ";

/// Captions images; the caption itself is the indexed text.
pub struct ImageTransformer {
    captioner: Arc<dyn ImageCaptioner>,
    timeout: Duration,
}

impl ImageTransformer {
    pub fn new(captioner: Arc<dyn ImageCaptioner>, timeout: Duration) -> Self {
        Self { captioner, timeout }
    }
}

#[async_trait]
impl ContentTransformer for ImageTransformer {
    fn name(&self) -> &str {
        "image"
    }

    fn can_handle(&self, path: &Path) -> bool {
        matches!(classify(path), Some(c) if c.category == Category::Image)
    }

    async fn process(&self, path: &Path) -> Result<Vec<NormalizedRecord>, ProcessingError> {
        let bytes = tokio::fs::read(path)
            .await
            .context("Failed to read image")
            .map_err(|e| ProcessingError::new(path, e))?;
        let metadata = file_metadata(path, Category::Image, None).await?;

        let captions = call_service("captioner", self.timeout, self.captioner.caption(&bytes))
            .await
            .map_err(|e| ProcessingError::new(path, e))?;

        let caption = captions
            .into_iter()
            .map(|c| c.trim().to_string())
            .find(|c| !c.is_empty())
            .ok_or_else(|| {
                ProcessingError::new(
                    path,
                    ServiceError::InvalidResponse {
                        service: "captioner",
                        message: "no caption returned".into(),
                    },
                )
            })?;

        Ok(vec![NormalizedRecord {
            content: format!("{}{}", CAPTION_PREFIX, caption),
            summary: None,
            category: Category::Image,
            metadata,
        }])
    }
}
