use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        log::debug!("Downloading image from: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| AppError::Download {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            log::warn!("Image download from {} answered with status {}", url, status);
            return Err(AppError::DownloadStatus {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(|source| AppError::Download {
            url: url.to_string(),
            source,
        })?;
        log::trace!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
