use crate::config::AppConfig;
use crate::error::AppError;
use crate::finder::{Finder, DEFAULT_LIMIT};
use crate::indexer::{IndexError, Indexer};
use crate::record::IndexRequest;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
}

async fn list_images(
    finder: web::Data<Finder>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    log::debug!("Received request for images with query: {:?}", query);
    let search_query = query.into_inner().q.unwrap_or_default();
    let records = finder.find(&search_query, DEFAULT_LIMIT).await?;
    Ok(HttpResponse::Ok().json(records))
}

async fn index_image(
    indexer: web::Data<Indexer>,
    request: web::Json<IndexRequest>,
) -> Result<HttpResponse, IndexError> {
    let request = request.into_inner();
    log::info!("Index request for {}", request.url);
    match indexer.index(request).await {
        Ok(record) => Ok(HttpResponse::Ok().json(record)),
        Err(e) => {
            log::error!("Indexing failed: {}", e);
            Err(e)
        }
    }
}

async fn queue_index_image(
    indexer: web::Data<Indexer>,
    request: web::Json<IndexRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    log::info!("Queueing index request for {}", request.url);
    indexer.queue(request);
    HttpResponse::Accepted().json(serde_json::json!({ "status": "queued" }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(list_images))
        .route("/index", web::post().to(index_image))
        .route("/queue-index", web::post().to(queue_index_image));
}

pub async fn start_web_server(
    config: Arc<AppConfig>,
    indexer: Indexer,
    finder: Finder,
) -> std::io::Result<()> {
    let port = config.web_port;
    let indexer_data = web::Data::new(indexer);
    let finder_data = web::Data::new(finder);

    log::info!("Starting web server on port: {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(indexer_data.clone())
            .app_data(finder_data.clone())
            .configure(routes)
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
