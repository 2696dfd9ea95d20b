use crate::annotator::AnnotatorFactory;
use crate::error::AppError;
use crate::fetcher::ImageFetcher;
use crate::record::{ImageRecord, IndexRequest};
use crate::store::{DocumentStore, SearchIndex};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::sync::Arc;
use thiserror::Error;

/// Which pipeline step failed, wrapping the backend error.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read image url {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: AppError,
    },

    #[error("failed to compute the new image tags: {0}")]
    Annotate(#[source] AppError),

    #[error("failed to put the new image into the document store: {0}")]
    DocumentStore(#[source] AppError),

    #[error("failed to add the new image to the search index: {0}")]
    SearchIndex(#[source] AppError),
}

impl ResponseError for IndexError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            IndexError::Annotate(AppError::AnnotatorInit(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            IndexError::Fetch { .. } | IndexError::Annotate(_) => StatusCode::BAD_GATEWAY,
            IndexError::DocumentStore(_) | IndexError::SearchIndex(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Runs the fetch / annotate / store / index pipeline for one image.
#[derive(Clone)]
pub struct Indexer {
    fetcher: Arc<dyn ImageFetcher>,
    annotators: Arc<dyn AnnotatorFactory>,
    documents: Arc<dyn DocumentStore>,
    search_index: Arc<dyn SearchIndex>,
}

impl Indexer {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        annotators: Arc<dyn AnnotatorFactory>,
        documents: Arc<dyn DocumentStore>,
        search_index: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            fetcher,
            annotators,
            documents,
            search_index,
        }
    }

    /// Nothing is written unless annotation completed. A failed document
    /// write skips the search index; a failed index write leaves the stored
    /// document in place.
    pub async fn index(&self, request: IndexRequest) -> Result<ImageRecord, IndexError> {
        let mut record = ImageRecord::from_request(request);
        log::debug!("Indexing {} as {}", record.url, record.id);

        record.tags = self.annotate(&record.url).await?;

        self.documents
            .put_record(&record)
            .await
            .map_err(IndexError::DocumentStore)?;

        self.search_index
            .put_entry(&record.id, &record.search_entry())
            .await
            .map_err(IndexError::SearchIndex)?;

        log::info!("Indexed image {} ({} tags)", record.id, record.tags.len());
        Ok(record)
    }

    /// Runs `index` in the background; failures are only logged.
    pub fn queue(&self, request: IndexRequest) {
        let indexer = self.clone();
        tokio::spawn(async move {
            let url = request.url.clone();
            if let Err(e) = indexer.index(request).await {
                log::error!("Queued indexing of {} failed: {}", url, e);
            }
        });
    }

    async fn annotate(&self, url: &str) -> Result<Vec<String>, IndexError> {
        let annotator = self.annotators.create().map_err(IndexError::Annotate)?;

        let image = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| IndexError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let tags = annotator
            .detect_labels(&image)
            .await
            .map_err(IndexError::Annotate)?;

        log::info!("For image: {}, found tags: {:?}", url, tags);
        Ok(tags)
    }
}
