use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use elasticsearch::Error as ElasticsearchError;
use serde_json::Error as SerdeJsonError;
use tantivy::{query::QueryParserError, TantivyError};
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Elasticsearch error: {0}")]
    Elasticsearch(#[from] ElasticsearchError),

    #[error("Elasticsearch responded with status {status}: {body}")]
    ElasticsearchStatus { status: u16, body: String },

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("Tantivy query parser error: {0}")]
    QueryParser(#[from] QueryParserError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("failed to download image at url {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download image at url {url}, response code is {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("failed to instantiate the annotation client: {0}")]
    AnnotatorInit(String),

    #[error("failed to detect image labels: {0}")]
    Annotation(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::QueryParser(_) => StatusCode::BAD_REQUEST,
            AppError::Download { .. }
            | AppError::DownloadStatus { .. }
            | AppError::Annotation(_) => StatusCode::BAD_GATEWAY,
            AppError::Io(_)
            | AppError::Elasticsearch(_)
            | AppError::ElasticsearchStatus { .. }
            | AppError::Tantivy(_)
            | AppError::Json(_)
            | AppError::Join(_)
            | AppError::AnnotatorInit(_)
            | AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
