use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct IndexRequest {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Fresh record with a new id and no tags yet.
    pub fn from_request(request: IndexRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: request.url,
            description: request.description,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn search_entry(&self) -> SearchEntry {
        SearchEntry {
            tags: self.tags.join(", "),
            created_at: self.created_at,
        }
    }
}

/// What the search index keeps for a record.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub tags: String,
    pub created_at: DateTime<Utc>,
}
