//! Upstream OCR and language-model APIs.
//!
//! Handlers only see the [`OcrProvider`] and [`CompletionProvider`] traits;
//! the concrete clients talk to Mistral and Groq over HTTPS.

pub mod groq;
pub mod mistral;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

pub use groq::GroqChat;
pub use mistral::MistralOcr;

const USER_AGENT: &str = "code-assist-api/0.1";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {message}")]
    Connection {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} rejected the API key: {message}")]
    Authentication {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} returned {status}: {message}")]
    Upstream {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

// ── Inputs ───────────────────────────────────────────────────────────────────

/// A decoded image ready to be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl ImageInput {
    /// Re-encodes the image as a `data:` URL, the form both vision APIs accept.
    pub fn to_data_url(&self) -> String {
        use base64::Engine as _;
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

// ── Traits ───────────────────────────────────────────────────────────────────

#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Returns the recognized text of the image as markdown.
    async fn recognize(&self, image: &ImageInput) -> Result<String, ProviderError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the raw completion text for a single user prompt.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    fn name(&self) -> &'static str;
}

// ── Shared HTTP plumbing ─────────────────────────────────────────────────────

pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

pub(crate) fn connection_error(provider: &'static str, e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        format!("TimeoutError: {e}")
    } else if e.is_connect() {
        format!("ConnectError: {e}")
    } else {
        format!("RequestError: {e}")
    };
    tracing::debug!("{provider} request failed: {message}");
    ProviderError::Connection { provider, message }
}

/// Turns a non-2xx upstream answer into a [`ProviderError`], keeping the body
/// so the caller can relay it.
pub(crate) async fn check_status(
    provider: &'static str,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = upstream_message(&body);

    tracing::debug!("{provider} API error ({status}): {message}");

    Err(match status.as_u16() {
        401 | 403 => ProviderError::Authentication { provider, message },
        code => ProviderError::Upstream {
            provider,
            status: code,
            message,
        },
    })
}

/// Pulls the human-readable part out of the usual JSON error envelopes
/// (`{"message": ..}`, `{"detail": ..}`, `{"error": {"message": ..}}`).
fn upstream_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let candidates = [
        value.pointer("/error/message"),
        value.get("message"),
        value.get("detail"),
        value.get("error"),
    ];
    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    message
}
