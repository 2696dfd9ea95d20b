use crate::config::AppConfig;
use crate::error::AppError;
use crate::record::ImageRecord;
use crate::store::DocumentStore;
use async_trait::async_trait;
use elasticsearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    Elasticsearch, IndexParts, MgetParts, SearchParts,
};
use serde_json::{json, Value};
use url::Url;

pub struct ElasticsearchDocumentStore {
    client: Elasticsearch,
    index: String,
}

impl ElasticsearchDocumentStore {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        log::debug!("Creating Elasticsearch client for URL: {}", config.elasticsearch_url);
        let url = Url::parse(&config.elasticsearch_url).map_err(|e| {
            AppError::Generic(format!("invalid elasticsearch_url {}: {}", config.elasticsearch_url, e))
        })?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| AppError::Generic(format!("failed to build Elasticsearch transport: {}", e)))?;
        log::trace!("Elasticsearch client created successfully.");
        Ok(Self {
            client: Elasticsearch::new(transport),
            index: config.document_index.clone(),
        })
    }
}

async fn ensure_success(response: Response) -> Result<Response, AppError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::ElasticsearchStatus {
        status: status.as_u16(),
        body,
    })
}

fn records_from_hits(body: &Value) -> Result<Vec<ImageRecord>, AppError> {
    let mut records = Vec::new();
    if let Some(hits) = body["hits"]["hits"].as_array() {
        for hit in hits {
            if hit["_source"].is_object() {
                records.push(serde_json::from_value(hit["_source"].clone())?);
            }
        }
    }
    Ok(records)
}

fn records_from_mget(body: &Value) -> Result<Vec<ImageRecord>, AppError> {
    let mut records = Vec::new();
    if let Some(docs) = body["docs"].as_array() {
        for doc in docs {
            if doc["found"].as_bool() == Some(true) {
                records.push(serde_json::from_value(doc["_source"].clone())?);
            } else {
                log::debug!("Document {} not found in store, skipping.", doc["_id"]);
            }
        }
    }
    Ok(records)
}

#[async_trait]
impl DocumentStore for ElasticsearchDocumentStore {
    async fn ensure_index_exists(&self) -> Result<(), AppError> {
        log::debug!("Checking if Elasticsearch index '{}' exists.", self.index);
        let index_exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[self.index.as_str()]))
            .send()
            .await?
            .status_code()
            .is_success();

        if index_exists {
            log::debug!("Elasticsearch index '{}' already exists.", self.index);
            return Ok(());
        }

        log::info!("Elasticsearch index '{}' does not exist. Creating it.", self.index);
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index))
            .body(json!({
                "mappings": {
                    "properties": {
                        "id": { "type": "keyword" },
                        "url": { "type": "keyword" },
                        "description": { "type": "text" },
                        "tags": { "type": "keyword" },
                        "createdAt": { "type": "date" }
                    }
                }
            }))
            .send()
            .await?;
        ensure_success(response).await?;
        log::info!("Elasticsearch index '{}' created successfully.", self.index);
        Ok(())
    }

    async fn put_record(&self, record: &ImageRecord) -> Result<(), AppError> {
        log::debug!("Storing record {} for {}", record.id, record.url);
        let response = self
            .client
            .index(IndexParts::IndexId(&self.index, &record.id))
            .body(record)
            .send()
            .await?;
        ensure_success(response).await?;
        log::trace!("Record {} stored.", record.id);
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ImageRecord>, AppError> {
        let response = self
            .client
            .search(SearchParts::Index(&[self.index.as_str()]))
            .body(json!({
                "query": { "match_all": {} },
                "sort": [{ "createdAt": { "order": "desc" } }],
                "size": limit
            }))
            .send()
            .await?;
        let body = ensure_success(response).await?.json::<Value>().await?;
        log::trace!("Elasticsearch search response: {:?}", body);

        let records = records_from_hits(&body)?;
        log::debug!("Listed {} records from '{}'", records.len(), self.index);
        Ok(records)
    }

    async fn get_records(&self, ids: &[String]) -> Result<Vec<ImageRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .mget(MgetParts::Index(&self.index))
            .body(json!({ "ids": ids }))
            .send()
            .await?;
        let body = ensure_success(response).await?.json::<Value>().await?;
        records_from_mget(&body)
    }
}
