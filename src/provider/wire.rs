//! Per-provider request encoding and response text extraction.
use super::ProviderKind;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fully encoded HTTP request for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

pub fn encode_request(
    kind: ProviderKind,
    model: &str,
    credential: &str,
    prompt: &str,
    max_output_tokens: u32,
) -> WireRequest {
    match kind {
        ProviderKind::Anthropic => WireRequest {
            url: "https://api.anthropic.com/v1/messages".to_string(),
            headers: vec![
                ("x-api-key", credential.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            body: json!({
                "model": model,
                "max_tokens": max_output_tokens,
                "messages": [{"role": "user", "content": prompt}],
            }),
        },
        ProviderKind::OpenAi => WireRequest {
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            headers: vec![("authorization", format!("Bearer {credential}"))],
            body: json!({
                "model": model,
                "max_completion_tokens": max_output_tokens,
                "messages": [{"role": "user", "content": prompt}],
            }),
        },
        ProviderKind::DeepSeek => WireRequest {
            url: "https://api.deepseek.com/chat/completions".to_string(),
            headers: vec![("authorization", format!("Bearer {credential}"))],
            body: json!({
                "model": model,
                "max_tokens": max_output_tokens,
                "stream": false,
                "messages": [{"role": "user", "content": prompt}],
            }),
        },
        ProviderKind::Gemini => WireRequest {
            url: format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
            ),
            headers: vec![("x-goog-api-key", credential.to_string())],
            body: json!({
                "contents": [{"role": "user", "parts": [{"text": prompt}]}],
                "generationConfig": {"maxOutputTokens": max_output_tokens},
            }),
        },
    }
}

/// Pull the generated text out of a success body.
pub fn extract_text(kind: ProviderKind, body: &Value) -> Option<String> {
    let text = match kind {
        ProviderKind::Anthropic => join_text(body.get("content")?.as_array()?),
        ProviderKind::OpenAi | ProviderKind::DeepSeek => body
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?
            .to_string(),
        ProviderKind::Gemini => join_text(
            body.get("candidates")?
                .get(0)?
                .get("content")?
                .get("parts")?
                .as_array()?,
        ),
    };
    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}

fn join_text(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(|block| block.get("text")?.as_str())
        .collect::<Vec<_>>()
        .join("")
}
