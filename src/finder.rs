use crate::error::AppError;
use crate::record::ImageRecord;
use crate::store::{DocumentStore, SearchIndex};
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct Finder {
    documents: Arc<dyn DocumentStore>,
    search_index: Arc<dyn SearchIndex>,
}

impl Finder {
    pub fn new(documents: Arc<dyn DocumentStore>, search_index: Arc<dyn SearchIndex>) -> Self {
        Self {
            documents,
            search_index,
        }
    }

    /// Most recent records for an empty query, tag matches otherwise.
    pub async fn find(&self, query: &str, limit: usize) -> Result<Vec<ImageRecord>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return self.documents.list_recent(limit).await;
        }

        let ids = self.search_index.search(query, limit).await?;
        log::debug!("Tag query '{}' matched {} ids", query, ids.len());
        self.documents.get_records(&ids).await
    }
}
