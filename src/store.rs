use crate::error::AppError;
use crate::record::{ImageRecord, SearchEntry};
use async_trait::async_trait;

/// Holds full records keyed by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_index_exists(&self) -> Result<(), AppError>;
    async fn put_record(&self, record: &ImageRecord) -> Result<(), AppError>;
    async fn list_recent(&self, limit: usize) -> Result<Vec<ImageRecord>, AppError>;
    /// Records for `ids` in the same order. Unknown ids are skipped.
    async fn get_records(&self, ids: &[String]) -> Result<Vec<ImageRecord>, AppError>;
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn put_entry(&self, id: &str, entry: &SearchEntry) -> Result<(), AppError>;
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, AppError>;
}
