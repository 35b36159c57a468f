//! HTTP front of the catalog: turns `GET /api/books` into a backend query and relays rows.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    backend::{BackendClient, BackendError},
    config::Config,
    types::page::{BooksPage, ErrorBody},
};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Backend not configured")]
    NotConfigured,
    #[error("Invalid query parameters: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ProxyError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Backend not configured"),
            ),
            ProxyError::BadRequest(details) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("Invalid query parameters").with_details(details),
            ),
            ProxyError::Backend(BackendError::Status { status, body }) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let message = if body.trim().is_empty() {
                    "Backend request failed".to_string()
                } else {
                    body.clone()
                };
                let mut error = ErrorBody::new(message);
                error.details = serde_json::from_str::<Value>(&body).ok();
                (status, error)
            }
            ProxyError::Backend(BackendError::Unreachable(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Backend unreachable").with_details(e.to_string()),
            ),
            ProxyError::Backend(BackendError::Decode(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Unexpected backend response").with_details(e.to_string()),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Per-process state. Read only, so requests never contend.
pub struct ProxyState {
    backend: Option<BackendClient>,
}

impl ProxyState {
    pub fn new(backend: Option<BackendClient>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.backend() {
            Ok(settings) => Self::new(Some(BackendClient::new(settings))),
            Err(e) => {
                warn!("{e}, every books request will fail");
                Self::new(None)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
    pub limit:  Option<u32>,
    pub offset: Option<u32>,
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/books", get(books))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn books(
    State(state): State<Arc<ProxyState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<BooksPage<Value>>, ProxyError> {
    info!(configured = state.backend.is_some(), "Books requested");
    let backend = state.backend.as_ref().ok_or(ProxyError::NotConfigured)?;
    let Query(params) = params.map_err(|e| ProxyError::BadRequest(e.body_text()))?;

    let query = backend
        .settings()
        .page_query(params.search, params.limit, params.offset);
    let page = backend.fetch_page(&query).await?;

    Ok(Json(BooksPage {
        data:   page.rows,
        limit:  Some(query.limit),
        offset: Some(query.offset),
        total:  page.total,
    }))
}

async fn health(State(state): State<Arc<ProxyState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "configured": state.backend.is_some(),
    }))
}
