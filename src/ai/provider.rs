use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::config::{LlmConfig, ProviderKind};

use super::{
    anthropic::AnthropicProvider, mock::MockProvider, ollama::OllamaProvider,
    openai::OpenAiProvider,
};

/// One analysis call. Scoring and drafting share the provider but use
/// different system prompts and sampling settings.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait TextAnalysisProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// A disabled provider (the mock, or one missing its credential)
    /// keeps the pipeline heuristic-only; callers check this before
    /// paying for a round trip.
    fn is_enabled(&self) -> bool;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String>;
}

/// Picks the provider once at startup. A configured provider with no
/// credential degrades to the mock rather than failing every call later.
pub fn build_provider(http: Client, config: &LlmConfig) -> Arc<dyn TextAnalysisProvider> {
    match config.provider {
        ProviderKind::Mock => Arc::new(MockProvider),
        ProviderKind::OpenAi => match &config.openai_api_key {
            Some(key) => Arc::new(OpenAiProvider::new(
                http,
                key.clone(),
                config.openai_model.clone(),
            )),
            None => {
                tracing::warn!(
                    target: "ai",
                    "LLM_PROVIDER=openai but OPENAI_API_KEY is unset; analysis disabled"
                );
                Arc::new(MockProvider)
            }
        },
        ProviderKind::Anthropic => match &config.anthropic_api_key {
            Some(key) => Arc::new(AnthropicProvider::new(
                http,
                key.clone(),
                config.anthropic_model.clone(),
            )),
            None => {
                tracing::warn!(
                    target: "ai",
                    "LLM_PROVIDER=anthropic but ANTHROPIC_API_KEY is unset; analysis disabled"
                );
                Arc::new(MockProvider)
            }
        },
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            http,
            config.ollama_url.clone(),
            config.ollama_model.clone(),
        )),
    }
}
