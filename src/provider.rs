//! Completion client over a closed set of text-generation providers.
//!
//! Two seams:
//!
//! - [`Transport`] performs exactly one request/response exchange and
//!   classifies failures into [`ErrorCode`] categories.
//! - [`CompletionClient`] is what the pipeline calls. [`RetryingClient`]
//!   implements it on top of any transport, retrying overload only.
//!
//! Provider selection is switch-style over [`ProviderKind`]; adding a
//! provider means adding a variant and its wire encoding.
mod error;
mod retry;
mod wire;

pub use error::{classify_status, parse_http_error, CompletionError, ErrorCode};
pub use retry::{RetryPolicy, RetryingClient};
pub use wire::{encode_request, extract_text, WireRequest};

use crate::config::AnalysisConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "anthropic")]
    Anthropic,
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "gemini")]
    Gemini,
    #[value(name = "deepseek")]
    DeepSeek,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-5-sonnet-latest",
            Self::OpenAi => "gpt-4o",
            Self::Gemini => "gemini-1.5-pro",
            Self::DeepSeek => "deepseek-chat",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::DeepSeek => write!(f, "deepseek"),
        }
    }
}

/// One raw exchange with a provider, no retries.
pub trait Transport {
    fn provider(&self) -> ProviderKind;
    fn send(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Submit a prompt, get text back.
pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Blocking HTTPS transport; waits at most the configured timeout.
pub struct HttpTransport {
    kind: ProviderKind,
    credential: String,
    model: String,
    max_output_tokens: u32,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(
        kind: ProviderKind,
        credential: impl Into<String>,
        model: impl Into<String>,
        max_output_tokens: u32,
        timeout: Duration,
    ) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            kind,
            credential: credential.into(),
            model: model.into(),
            max_output_tokens,
            agent,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn transport_error(&self, what: &str, err: impl std::fmt::Display) -> CompletionError {
        CompletionError::new(ErrorCode::Unknown, self.kind, format!("{what}: {err}"))
    }
}

impl Transport for HttpTransport {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn send(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = encode_request(
            self.kind,
            &self.model,
            &self.credential,
            prompt,
            self.max_output_tokens,
        );
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        let started = std::time::Instant::now();
        let mut response = builder
            .send_json(&request.body)
            .map_err(|err| self.transport_error("request failed", err))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| self.transport_error("read response body", err))?;

        tracing::info!(
            provider = %self.kind,
            model = %self.model,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = body.len(),
            "completion call finished"
        );

        if !(200..300).contains(&status) {
            return Err(parse_http_error(self.kind, status, &body));
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|err| self.transport_error("decode response JSON", err))?;
        extract_text(self.kind, &value).ok_or_else(|| {
            CompletionError::new(
                ErrorCode::Unknown,
                self.kind,
                "response contained no generated text",
            )
        })
    }
}

/// Build the retrying HTTP client described by `config`.
pub fn build_client(config: &AnalysisConfig, credential: &str) -> RetryingClient<HttpTransport> {
    let transport = HttpTransport::new(
        config.provider,
        credential,
        config.model_id(),
        config.max_output_tokens,
        config.request_timeout(),
    );
    RetryingClient::new(transport, RetryPolicy::from(&config.retry))
}

fn one_off_client(provider: ProviderKind, credential: &str) -> RetryingClient<HttpTransport> {
    let config = AnalysisConfig {
        provider,
        ..AnalysisConfig::default()
    };
    build_client(&config, credential)
}

/// One-off completion with default settings for `provider`.
pub fn complete(
    provider: ProviderKind,
    credential: &str,
    prompt: &str,
) -> Result<String, CompletionError> {
    one_off_client(provider, credential).complete(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    #[test]
    fn provider_names_round_trip_through_serde() {
        for kind in [
            ProviderKind::Anthropic,
            ProviderKind::OpenAi,
            ProviderKind::Gemini,
            ProviderKind::DeepSeek,
        ] {
            let encoded = serde_json::to_string(&kind).expect("encode");
            assert_eq!(encoded, format!("\"{kind}\""));
            let decoded: ProviderKind = serde_json::from_str(&encoded).expect("decode");
            assert_eq!(decoded, kind);
        }
    }

    #[test]
    fn build_client_uses_config_retry_policy() {
        let mut config = default_config();
        config.provider = ProviderKind::DeepSeek;
        config.retry.max_attempts = 4;
        config.retry.base_delay_ms = 250;
        let client = build_client(&config, "key");
        assert_eq!(client.transport().provider(), ProviderKind::DeepSeek);
        assert_eq!(client.policy().max_attempts, 4);
        assert_eq!(client.policy().base_delay, Duration::from_millis(250));
    }

    #[test]
    fn one_off_client_uses_provider_defaults() {
        let defaults = RetryPolicy::from(&default_config().retry);
        for kind in [ProviderKind::Anthropic, ProviderKind::Gemini] {
            let client = one_off_client(kind, "key");
            assert_eq!(client.transport().provider(), kind);
            assert_eq!(client.transport().model(), kind.default_model());
            assert_eq!(client.policy(), defaults);
        }
    }
}
