//! HTTP server exposing fetch, count and clustering endpoints

use super::handler::{
    all_companies_handler, clustered_companies_handler, count_companies_handler,
    fetch_status_handler, index_handler, perform_clustering_handler, start_fetch_handler,
};
use crate::core::CorporateService;
use crate::utils::error::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub struct HttpServer {
    service: CorporateService,
    bind: String,
}

impl HttpServer {
    pub fn new(service: CorporateService, bind: impl Into<String>) -> Self {
        Self {
            service,
            bind: bind.into(),
        }
    }

    /// All routes with shared service state and permissive CORS.
    pub fn router(service: CorporateService) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/start_fetch", post(start_fetch_handler))
            .route("/fetch_status", get(fetch_status_handler))
            .route("/count_companies", post(count_companies_handler))
            .route("/perform_clustering", post(perform_clustering_handler))
            .route("/clustered_companies", get(clustered_companies_handler))
            .route("/all_companies", get(all_companies_handler))
            .route("/corporate_results", get(all_companies_handler))
            .layer(CorsLayer::permissive())
            .with_state(service)
    }

    pub async fn start(&self) -> Result<()> {
        let app = Self::router(self.service.clone());

        let listener = tokio::net::TcpListener::bind(&self.bind).await?;
        info!("🚀 Corporate fetch API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
