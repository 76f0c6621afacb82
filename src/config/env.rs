use std::{str::FromStr, time::Duration};

use thiserror::Error;

/// Posts scoring at or above this value are treated as high risk.
/// The store's score-distribution buckets read the same constant.
pub const MISINFO_THRESHOLD_HIGH: i64 = 70;
/// Lower bound of the medium-risk bucket.
pub const MISINFO_THRESHOLD_MEDIUM: i64 = 40;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub collection: CollectionConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Mock,
    OpenAi,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mock" => Ok(ProviderKind::Mock),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(ConfigError::Invalid {
                key: "LLM_PROVIDER",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub scroll_passes: u32,
    pub scroll_delay: Duration,
    pub max_posts_per_target: usize,
    pub max_targets_per_run: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub data_dir: String,
    pub logs_dir: String,
    pub db_filename: String,
    pub targets_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
