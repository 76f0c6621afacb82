use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{AnalysisRequest, TextAnalysisProvider};

const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OllamaProvider {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(http: Client, base_url: String, model: String) -> Self {
        Self {
            http,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl TextAnalysisProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        // Ollama's generate endpoint has no system slot, so the system
        // prompt rides in front of the user prompt.
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: format!("{}\n\n{}", request.system, request.prompt),
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
            },
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let completion: GenerateResponse = response.json().await?;
        Ok(completion.response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
