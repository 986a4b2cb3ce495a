use serde::{Deserialize, Serialize};

/// `language` is only logged, so any JSON value is accepted there.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub image_data_list: Vec<String>,
    #[serde(default)]
    pub language: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub text: String,
}

/// `problemInfo` is kept as a raw JSON value so a non-string payload is
/// rejected with the same message as a missing one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub problem_info: Option<serde_json::Value>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
