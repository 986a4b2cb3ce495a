use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;
use crate::models::{ExtractRequest, ExtractResponse};
use crate::provider::{ImageInput, OcrProvider};

// ── Constants ────────────────────────────────────────────────────────────────

const FALLBACK_MIME: &str = "image/jpeg";

// ── Lazy static regexes ──────────────────────────────────────────────────────

static DATA_URL_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^data:[a-z0-9.+/-]*(?:;[a-z0-9=.+-]+)*;base64,").unwrap());

// ── Public API ───────────────────────────────────────────────────────────────

pub async fn extract_text(
    ocr: &dyn OcrProvider,
    req: ExtractRequest,
) -> Result<ExtractResponse, ApiError> {
    let first = req
        .image_data_list
        .first()
        .ok_or_else(|| ApiError::BadRequest("imageDataList cannot be empty.".to_string()))?;

    if req.image_data_list.len() > 1 {
        tracing::debug!(
            "ignoring {} extra image(s) in imageDataList",
            req.image_data_list.len() - 1
        );
    }

    let image = decode_image(first)?;

    tracing::info!(
        provider = ocr.name(),
        mime = image.mime_type,
        bytes = image.bytes.len(),
        language = req.language.as_ref().and_then(|v| v.as_str()).unwrap_or("-"),
        "running OCR"
    );

    let text = ocr.recognize(&image).await?;
    Ok(ExtractResponse { text })
}

// ── Image decoding ───────────────────────────────────────────────────────────

/// Decodes one `imageDataList` entry. Accepts bare base64 or a full `data:`
/// URL; embedded whitespace is ignored.
pub fn decode_image(entry: &str) -> Result<ImageInput, ApiError> {
    let trimmed = entry.trim();
    let payload = match DATA_URL_PREFIX_RE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(ApiError::BadRequest(
            "The first entry of imageDataList is empty.".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("Image is not valid base64: {e}")))?;

    let mime_type = sniff_mime(&bytes);
    Ok(ImageInput { bytes, mime_type })
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        FALLBACK_MIME
    }
}
