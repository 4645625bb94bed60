//! HTTP handlers for the corporate fetch API

use crate::core::CorporateService;
use crate::domain::model::FetchStatus;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

const INDEX_HTML: &str = include_str!("static/index.html");

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchStatusResponse {
    pub fetch_status: FetchStatus,
    pub corporate_count: usize,
}

/// Escapes text for embedding in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn pre_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => Html(format!("<pre>{}</pre>", escape_html(&pretty))).into_response(),
        Err(e) => {
            tracing::error!("❌ Failed to render JSON: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn start_fetch_handler(State(service): State<CorporateService>) -> impl IntoResponse {
    let outcome = service.start_fetch().await;
    MessageResponse::new(outcome.message())
}

pub async fn fetch_status_handler(
    State(service): State<CorporateService>,
) -> Json<FetchStatusResponse> {
    let (fetch_status, corporate_count) = service.state().progress().await;
    Json(FetchStatusResponse {
        fetch_status,
        corporate_count,
    })
}

pub async fn count_companies_handler(State(service): State<CorporateService>) -> impl IntoResponse {
    MessageResponse::new(service.count_message().await)
}

pub async fn perform_clustering_handler(State(service): State<CorporateService>) -> Response {
    match service.clustering_message().await {
        Ok(message) => MessageResponse::new(message).into_response(),
        Err(e) => {
            tracing::error!(
                "❌ Clustering failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                MessageResponse::new(e.user_friendly_message()),
            )
                .into_response()
        }
    }
}

pub async fn clustered_companies_handler(State(service): State<CorporateService>) -> Response {
    match service.state().clusters().await {
        Some(report) => pre_json(&report),
        None => Html("<h1>Clustering not performed yet...</h1>").into_response(),
    }
}

pub async fn all_companies_handler(State(service): State<CorporateService>) -> Response {
    let collection = service.state().collection().await;
    if collection.corporate_details.is_empty() {
        return Html("<h1>No companies fetched yet...</h1>").into_response();
    }
    pre_json(&collection)
}
