//! Stubs shared by the unit tests of the pipeline and the web layer.

use crate::annotator::{Annotator, AnnotatorFactory};
use crate::error::AppError;
use crate::fetcher::ImageFetcher;
use crate::record::{ImageRecord, SearchEntry};
use crate::store::{DocumentStore, SearchIndex};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves a single canned HTTP response and hands back the raw request.
pub async fn serve_capturing(
    status: &str,
    content_type: &str,
    body: Vec<u8>,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let head = response_head(status, content_type, body.len());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{}/resource", addr), handle)
}

/// Answers one connection per canned `(status, json body)` pair, in order.
/// Returns the base url and the raw requests seen.
pub async fn serve_sequence(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::with_capacity(responses.len());
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);
            let head = response_head(status, "application/json", body.len());
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
        requests
    });

    (format!("http://{}", addr), handle)
}

fn response_head(status: &str, content_type: &str, content_length: usize) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Elastic-Product: Elasticsearch\r\nConnection: close\r\n\r\n",
        status, content_type, content_length
    )
}

pub async fn serve_once(status: &str, content_type: &str, body: Vec<u8>) -> String {
    serve_capturing(status, content_type, body).await.0
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

pub struct StubFetcher {
    pub status: Option<u16>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn ok() -> Self {
        Self { status: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing(status: u16) -> Self {
        Self { status: Some(status), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(AppError::DownloadStatus { url: url.to_string(), status }),
            None => Ok(b"fake image".to_vec()),
        }
    }
}

pub struct StubAnnotator {
    labels: Option<Vec<String>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Annotator for StubAnnotator {
    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<String>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.labels
            .clone()
            .ok_or_else(|| AppError::Annotation("quota exceeded".into()))
    }
}

pub struct StubAnnotatorFactory {
    pub labels: Option<Vec<String>>,
    pub fail_create: bool,
    pub detect_calls: Arc<AtomicUsize>,
}

impl StubAnnotatorFactory {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: Some(labels.iter().map(|l| l.to_string()).collect()),
            fail_create: false,
            detect_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_detection() -> Self {
        Self { labels: None, fail_create: false, detect_calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn failing_creation() -> Self {
        Self { labels: None, fail_create: true, detect_calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

impl AnnotatorFactory for StubAnnotatorFactory {
    fn create(&self) -> Result<Arc<dyn Annotator>, AppError> {
        if self.fail_create {
            return Err(AppError::AnnotatorInit("no API key".into()));
        }
        Ok(Arc::new(StubAnnotator {
            labels: self.labels.clone(),
            calls: self.detect_calls.clone(),
        }))
    }
}

#[derive(Default)]
pub struct RecordingDocumentStore {
    pub fail: bool,
    pub records: Mutex<Vec<ImageRecord>>,
}

impl RecordingDocumentStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn stored(&self) -> Vec<ImageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for RecordingDocumentStore {
    async fn ensure_index_exists(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn put_record(&self, record: &ImageRecord) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::ElasticsearchStatus { status: 503, body: "unavailable".into() });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ImageRecord>, AppError> {
        let mut records = self.stored();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn get_records(&self, ids: &[String]) -> Result<Vec<ImageRecord>, AppError> {
        let records = self.stored();
        Ok(ids
            .iter()
            .filter_map(|id| records.iter().find(|r| &r.id == id).cloned())
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingSearchIndex {
    pub fail: bool,
    pub entries: Mutex<Vec<(String, SearchEntry)>>,
}

impl RecordingSearchIndex {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn stored(&self) -> Vec<(String, SearchEntry)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchIndex for RecordingSearchIndex {
    async fn put_entry(&self, id: &str, entry: &SearchEntry) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Generic("index is read-only".into()));
        }
        self.entries.lock().unwrap().push((id.to_string(), entry.clone()));
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, AppError> {
        Ok(self
            .stored()
            .into_iter()
            .filter(|(_, entry)| entry.tags.split(", ").any(|tag| tag == query))
            .map(|(id, _)| id)
            .take(limit)
            .collect())
    }
}
