//! Request handlers for the processing endpoint and liveness probes

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppContext;
use crate::records::AudioRecord;
use crate::Error;

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
    #[serde(rename = "dbRecord")]
    pub db_record: AudioRecord,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// POST /process - run the full pipeline for one media URL.
pub async fn process(
    State(ctx): State<AppContext>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, Error> {
    let Json(request) = payload.map_err(|rejection| {
        Error::InvalidRequest(format!("invalid request body: {}", rejection.body_text()))
    })?;

    if request.url.trim().is_empty() {
        return Err(Error::InvalidRequest("url must not be empty".into()));
    }

    info!("Processing request for URL: {}", request.url);

    let outcome = ctx.pipeline.process(&request.url).await.inspect_err(|e| {
        if !e.is_client_fault() {
            error!("Processing error for {}: {}", request.url, e);
        }
    })?;

    Ok(Json(ProcessResponse {
        success: true,
        audio_url: outcome.audio_url,
        db_record: outcome.record,
    }))
}

/// GET / - plain liveness confirmation.
pub async fn index() -> &'static str {
    "audio-relay is running"
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
