use crate::config::AppConfig;
use crate::error::AppError;
use crate::record::SearchEntry;
use crate::store::SearchIndex;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, INDEXED, STORED, STRING, TEXT};
use tantivy::{Document, Index, IndexWriter, TantivyError, Term};

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Clone, Copy)]
struct Fields {
    id: Field,
    tags: Field,
    created_at: Field,
}

/// Runs `stage` and commits its work, or rolls the writer back to the last
/// commit so a failed put cannot leak into the next caller's commit.
fn commit_or_rollback<F>(writer: &mut IndexWriter, stage: F) -> Result<(), AppError>
where
    F: FnOnce(&mut IndexWriter) -> tantivy::Result<()>,
{
    if let Err(e) = stage(&mut *writer) {
        log::warn!("Tag index update failed, rolling back: {}", e);
        if let Err(rollback_err) = writer.rollback() {
            log::error!("Tag index rollback failed: {}", rollback_err);
        }
        return Err(e.into());
    }
    Ok(())
}

fn build_schema() -> (Schema, Fields) {
    let mut schema_builder = Schema::builder();
    let id = schema_builder.add_text_field("id", STRING | STORED);
    let tags = schema_builder.add_text_field("tags", TEXT | STORED);
    let created_at = schema_builder.add_i64_field("created_at", INDEXED | STORED);
    (schema_builder.build(), Fields { id, tags, created_at })
}

pub struct TantivySearchIndex {
    index: Index,
    writer: Arc<Mutex<IndexWriter>>,
    fields: Fields,
}

impl TantivySearchIndex {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let index_path = &config.tantivy_index_path;
        log::debug!("Opening Tantivy tag index at: {}", index_path);
        std::fs::create_dir_all(index_path)?;

        let (schema, fields) = build_schema();
        let directory = MmapDirectory::open(index_path).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, schema)?;
        log::debug!("Tantivy tag index ready.");
        Self::with_index(index, fields)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, AppError> {
        let (schema, fields) = build_schema();
        Self::with_index(Index::create_in_ram(schema), fields)
    }

    fn with_index(index: Index, fields: Fields) -> Result<Self, AppError> {
        let writer = index.writer(WRITER_HEAP_BYTES)?;
        Ok(Self {
            index,
            writer: Arc::new(Mutex::new(writer)),
            fields,
        })
    }

    #[cfg(test)]
    fn num_docs(&self) -> u64 {
        self.index.reader().unwrap().searcher().num_docs()
    }
}

#[async_trait]
impl SearchIndex for TantivySearchIndex {
    async fn put_entry(&self, id: &str, entry: &SearchEntry) -> Result<(), AppError> {
        let writer = self.writer.clone();
        let fields = self.fields;
        let id = id.to_string();
        let tags = entry.tags.clone();
        let created_at = entry.created_at.timestamp_micros();

        tokio::task::spawn_blocking(move || {
            let mut index_writer = writer
                .lock()
                .map_err(|_| AppError::Generic("tag index writer lock poisoned".into()))?;

            let mut doc = Document::default();
            doc.add_text(fields.id, &id);
            doc.add_text(fields.tags, &tags);
            doc.add_i64(fields.created_at, created_at);

            commit_or_rollback(&mut index_writer, |w| {
                w.delete_term(Term::from_field_text(fields.id, &id));
                w.add_document(doc)?;
                w.commit()?;
                Ok(())
            })?;
            log::debug!("Tag entry for {} committed: [{}]", id, tags);
            Ok(())
        })
        .await?
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let index = self.index.clone();
        let fields = self.fields;
        let query = query.to_string();

        tokio::task::spawn_blocking(move || {
            log::debug!("Searching tag index for: {}", query);
            let searcher = index.reader()?.searcher();
            let query_parser = QueryParser::for_index(&index, vec![fields.tags]);
            let query_obj = query_parser.parse_query(&query)?;
            let top_docs = searcher.search(&query_obj, &TopDocs::with_limit(limit))?;

            let mut ids = Vec::with_capacity(top_docs.len());
            for (_score, doc_address) in top_docs {
                let retrieved_doc = searcher.doc(doc_address)?;
                if let Some(id) = retrieved_doc.get_first(fields.id).and_then(|v| v.as_text()) {
                    ids.push(id.to_string());
                }
            }
            log::debug!("Found {} tag matches for query: {}", ids.len(), query);
            Ok(ids)
        })
        .await?
    }
}
