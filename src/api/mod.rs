//! HTTP surface: router, shared context and error-to-response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::pipeline::Pipeline;
use crate::Error;

pub mod handlers;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/process", post(handlers::process))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = if self.is_client_fault() {
            (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Processing failed",
                    "details": self.to_string(),
                }),
            )
        };

        (status, Json(body)).into_response()
    }
}
