//! HTTP API for the web front-end.
//!
//! Text and voice question answering, ingestion, briefs and PDF export.

mod handlers;
mod prompt;

pub use prompt::{extract_video_url, parse_ingestion_url};

use crate::app::Services;
use crate::error::EvrikaError;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Error returned by a handler, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<EvrikaError> for ApiError {
    fn from(e: EvrikaError) -> Self {
        let status = match &e {
            EvrikaError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EvrikaError::VideoNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Headers the browser front-end sends, including the ngrok interstitial bypass.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("ngrok-skip-browser-warning"),
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::USER_AGENT,
            HeaderName::from_static("dnt"),
            header::CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
}

/// Build the application router.
pub fn router(state: Arc<Services>) -> Router {
    let body_limit = state.settings.server.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/ingest", post(handlers::ingest))
        .route("/brief", post(handlers::brief))
        .route("/generate-brief", post(handlers::generate_brief_form))
        .route("/brief/pdf", post(handlers::brief_pdf))
        .route("/text-query", post(handlers::text_query))
        .route("/voice-query", post(handlers::voice_query))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<Services>, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await
}
