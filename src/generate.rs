use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::{GenerateRequest, GenerateResponse};
use crate::provider::{CompletionProvider, ProviderError};

pub const DEFAULT_LANGUAGE: &str = "python";

// Reasoning models prepend their chain of thought to the answer.
static THINK_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*<think>.*?</think>\s*").unwrap());

pub async fn generate_code(
    llm: &dyn CompletionProvider,
    req: GenerateRequest,
) -> Result<GenerateResponse, ApiError> {
    let problem_info = match req.problem_info {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => {
            return Err(ApiError::BadRequest(
                "problemInfo must be a non-empty string.".to_string(),
            ))
        }
    };
    let language = req
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE);

    tracing::info!(
        provider = llm.name(),
        language,
        problem_len = problem_info.len(),
        "generating solution"
    );

    let prompt = build_prompt(&problem_info, language);
    let completion = llm.complete(&prompt).await?;

    let code = strip_reasoning(&completion);
    if code.trim().is_empty() {
        return Err(ProviderError::InvalidResponse {
            provider: llm.name(),
            message: "model returned an empty completion".to_string(),
        }
        .into());
    }

    Ok(GenerateResponse {
        code: code.to_string(),
    })
}

pub fn build_prompt(problem_info: &str, language: &str) -> String {
    format!(
        "Generate a complete solution in {language}. \
         Return a JSON object with 'Explanation', 'Code', 'Time Complexity', 'Space Complexity', \
         'complexity_explanation', and 'Problem Information' keys. \
         'Explanation' should cover brute force, better, and optimal approaches in short paragraphs. \
         'Code' should be formatted within triple backticks. \
         'Time Complexity' and 'Space Complexity' should be in Big O notation. \
         'complexity_explanation' should explain the complexities. \
         'Problem Information' should include the title and problem description. \
         Ensure proper JSON formatting and no additional commentary. \
         Problem Information: {problem_info}."
    )
}

fn strip_reasoning(completion: &str) -> &str {
    match THINK_BLOCK_RE.find(completion) {
        Some(m) => &completion[m.end()..],
        None => completion,
    }
}
