use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{check_status, connection_error, ImageInput, OcrProvider, ProviderError};

const PROVIDER: &str = "Mistral OCR";

/// Mistral's document OCR endpoint.
pub struct MistralOcr {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl MistralOcr {
    pub fn new(client: Client, base_url: String, api_key: SecretString, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OcrDocument {
    ImageUrl { image_url: String },
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Deserialize)]
struct OcrPage {
    #[serde(default)]
    markdown: String,
}

#[async_trait]
impl OcrProvider for MistralOcr {
    async fn recognize(&self, image: &ImageInput) -> Result<String, ProviderError> {
        let url = format!("{}/ocr", self.base_url);

        tracing::debug!(
            "Mistral OCR request: model={}, mime={}, bytes={}",
            self.model,
            image.mime_type,
            image.bytes.len(),
        );

        let body = OcrRequest {
            model: &self.model,
            document: OcrDocument::ImageUrl {
                image_url: image.to_data_url(),
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| connection_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;

        let parsed: OcrResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: PROVIDER,
                    message: e.to_string(),
                })?;

        // A single image always comes back as one page.
        let page = parsed
            .pages
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "no pages in OCR result".to_string(),
            })?;

        tracing::debug!("Mistral OCR complete, {} chars", page.markdown.len());

        Ok(page.markdown)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
