use crate::config::AppConfig;
use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use url::Url;

#[async_trait]
pub trait Annotator: Send + Sync {
    /// Label descriptions for the image, most relevant first.
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, AppError>;
}

/// Builds a fresh annotator for every indexing request.
pub trait AnnotatorFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Annotator>, AppError>;
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAnnotation {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Google Cloud Vision label detection over the REST `images:annotate` call.
/// The key travels in the `x-goog-api-key` header, never in the url.
pub struct VisionAnnotator {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    max_labels: usize,
}

const API_KEY_HEADER: &str = "x-goog-api-key";

#[async_trait]
impl Annotator for VisionAnnotator {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, AppError> {
        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "LABEL_DETECTION", "maxResults": self.max_labels }]
            }]
        });

        log::debug!("Requesting label detection for {} bytes", image.len());
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Annotation(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Annotation(format!(
                "vision API answered {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| {
                AppError::Annotation(format!("unreadable vision response: {}", e.without_url()))
            })?;
        log::trace!("Vision response: {:?}", parsed);

        let annotation = match parsed.responses.into_iter().next() {
            Some(annotation) => annotation,
            None => return Ok(Vec::new()),
        };
        if let Some(error) = annotation.error {
            return Err(AppError::Annotation(format!(
                "code {}: {}",
                error.code, error.message
            )));
        }

        Ok(annotation
            .label_annotations
            .into_iter()
            .map(|label| label.description)
            .take(self.max_labels)
            .collect())
    }
}

pub struct VisionAnnotatorFactory {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_labels: usize,
}

impl VisionAnnotatorFactory {
    pub fn new(config: &AppConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: config.vision_api_key.clone(),
            endpoint: config.vision_endpoint.clone(),
            max_labels: config.max_labels,
        }
    }
}

impl AnnotatorFactory for VisionAnnotatorFactory {
    fn create(&self) -> Result<Arc<dyn Annotator>, AppError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(AppError::AnnotatorInit("vision API key is not set".into()));
        }
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| AppError::AnnotatorInit(format!("invalid vision endpoint: {}", e)))?;

        Ok(Arc::new(VisionAnnotator {
            client: self.client.clone(),
            endpoint,
            api_key: key.to_string(),
            max_labels: self.max_labels,
        }))
    }
}
