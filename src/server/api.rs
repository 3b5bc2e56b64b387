//! HTTP API server implementation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::errors::NewsError;
use crate::core::models::{Article, ArticleQuery, Category};
use crate::core::store::NewsStore;

/// Largest page the API will return
const MAX_LIMIT: usize = 100;
const DEFAULT_LIMIT: usize = 20;

/// Application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn NewsStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn NewsStore>) -> Self {
        Self { store }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Query string accepted by `/articles`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    #[serde(default)]
    pub featured: bool,
    pub category: Option<String>,
}

impl From<ListParams> for ArticleQuery {
    fn from(params: ListParams) -> Self {
        ArticleQuery {
            limit: Some(params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)),
            featured_only: params.featured,
            category: params.category.filter(|c| !c.is_empty()),
        }
    }
}

/// Body of `GET /articles`
#[derive(Serialize)]
pub struct ArticlesResponse {
    pub count: usize,
    pub articles: Vec<Article>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Message and machine-readable code of an error body
#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Error returned by handlers
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            code: "not_found",
        }
    }
}

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        warn!("Backend request failed: {}", err);
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
            code: "backend_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.message,
                code: Some(self.code.to_string()),
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Health check handler
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let query = ArticleQuery::from(params);
    let articles = state.store.list_articles(&query).await?;
    Ok(Json(ArticlesResponse {
        count: articles.len(),
        articles,
    }))
}

async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>, ApiError> {
    state
        .store
        .article_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No article with slug {}", slug)))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.list_categories().await?))
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/articles", get(list_articles))
        .route("/articles/:slug", get(get_article))
        .route("/categories", get(list_categories))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(host: String, port: u16, store: Arc<dyn NewsStore>) -> anyhow::Result<()> {
    let app = router(AppState::new(store));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
