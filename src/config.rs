//! Analysis configuration helpers.
//!
//! Loads, validates and normalizes the JSON config so a run is fully
//! described by one file plus CLI overrides. Credentials never live here.
use crate::provider::ProviderKind;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Environment variable consulted when no `--api-key` is given.
pub const API_KEY_ENV: &str = "FLOWSCOPE_API_KEY";

const MIN_RETRY_ATTEMPTS: u32 = 2;
const MAX_RETRY_ATTEMPTS: u32 = 4;

/// Overload retry policy for the completion client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
        }
    }
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub schema_version: u32,
    pub provider: ProviderKind,
    /// Overrides the provider's default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub max_output_tokens: u32,
    /// Aggregate cost above which the set is analyzed in chunks.
    pub size_threshold: usize,
    /// Record count above which the set is analyzed in chunks.
    pub count_threshold: usize,
    pub max_chunk_cost: usize,
    pub retry: RetryConfig,
    pub inter_chunk_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Per-entry excerpt length in the aggregate summary prompt.
    pub excerpt_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        default_config()
    }
}

impl AnalysisConfig {
    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Model id to send, falling back to the provider default.
    pub fn model_id(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// Build the default config used when no file is given.
pub fn default_config() -> AnalysisConfig {
    AnalysisConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        provider: ProviderKind::Anthropic,
        model: None,
        max_output_tokens: 4_096,
        size_threshold: 100_000,
        count_threshold: 15,
        max_chunk_cost: 12_000,
        retry: RetryConfig::default(),
        inter_chunk_delay_ms: 1_500,
        request_timeout_secs: 120,
        excerpt_chars: 200,
    }
}

/// Render a pretty JSON config stub for `flowscope config`.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_config()).context("serialize config stub")
}

pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: AnalysisConfig =
        serde_json::from_slice(&bytes).context("parse analysis config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &AnalysisConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize analysis config")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Validate schema version and numeric ranges.
pub fn validate_config(config: &AnalysisConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.size_threshold == 0 || config.count_threshold == 0 || config.max_chunk_cost == 0 {
        return Err(anyhow!(
            "size_threshold, count_threshold and max_chunk_cost must be non-zero"
        ));
    }
    if !(MIN_RETRY_ATTEMPTS..=MAX_RETRY_ATTEMPTS).contains(&config.retry.max_attempts) {
        return Err(anyhow!(
            "retry.max_attempts must be between {MIN_RETRY_ATTEMPTS} and {MAX_RETRY_ATTEMPTS} (got {})",
            config.retry.max_attempts
        ));
    }
    if config.request_timeout_secs == 0 {
        return Err(anyhow!("request_timeout_secs must be positive"));
    }
    if config.max_output_tokens == 0 {
        return Err(anyhow!("max_output_tokens must be positive"));
    }
    if let Some(model) = config.model.as_deref() {
        if model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty when set"));
        }
    }
    Ok(())
}

/// Pick the credential: explicit flag first, then the environment.
pub fn resolve_credential(flag: Option<&str>) -> Result<String> {
    if let Some(key) = flag.map(str::trim).filter(|key| !key.is_empty()) {
        return Ok(key.to_string());
    }
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(anyhow!(
            "no API key: pass --api-key or set {API_KEY_ENV}"
        )),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
