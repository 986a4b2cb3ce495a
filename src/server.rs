use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::extract;
use crate::generate;
use crate::models::{ExtractRequest, GenerateRequest};
use crate::provider::{http_client, CompletionProvider, GroqChat, MistralOcr, OcrProvider};

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub ocr: Arc<dyn OcrProvider>,
    pub llm: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(ocr: Arc<dyn OcrProvider>, llm: Arc<dyn CompletionProvider>) -> Self {
        Self { ocr, llm }
    }

    /// Wires the Mistral and Groq clients described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = http_client(config.upstream_timeout)?;

        let ocr = MistralOcr::new(
            client.clone(),
            config.ocr.base_url.clone(),
            config.ocr.api_key.clone(),
            config.ocr.model.clone(),
        );
        let llm = GroqChat::new(
            client,
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            config.llm.model.clone(),
        );

        Ok(Self::new(Arc::new(ocr), Arc::new(llm)))
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/extract", post(extract_endpoint))
        .route("/api/generate", post(generate_endpoint))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn extract_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return reject_body(rejection),
    };

    match extract::extract_text(state.ocr.as_ref(), req).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn generate_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return reject_body(rejection),
    };

    match generate::generate_code(state.llm.as_ref(), req).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

// Oversized bodies keep their 413; every other body problem is a plain 400.
fn reject_body(rejection: JsonRejection) -> Response {
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    let detail = rejection.body_text();
    tracing::warn!("rejected request body ({status}): {detail}");
    (status, Json(json!({"detail": detail}))).into_response()
}
