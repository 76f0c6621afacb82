use std::{env, time::Duration};

use super::env::{
    AppConfig, BrowserConfig, CollectionConfig, ConfigError, DirectoryConfig, LlmConfig,
    LoggingConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let llm = LlmConfig {
            provider: env::var("LLM_PROVIDER")
                .unwrap_or_else(|_| "mock".to_string())
                .parse()?,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4-turbo-preview".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|v| !v.is_empty()),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-3-sonnet-20240229".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama2".to_string()),
        };

        let browser = BrowserConfig {
            headless: env::var("BROWSER_HEADLESS")
                .map(|v| v.to_ascii_lowercase() == "true")
                .unwrap_or(false),
            timeout: Duration::from_millis(parse_u64("BROWSER_TIMEOUT_MS").unwrap_or(30_000)),
        };

        let collection = CollectionConfig {
            scroll_passes: parse_u64("DEFAULT_SCROLL_PASSES").unwrap_or(3) as u32,
            scroll_delay: Duration::from_secs_f64(
                env::var("DEFAULT_SCROLL_DELAY")
                    .ok()
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .unwrap_or(2.0),
            ),
            max_posts_per_target: parse_u64("DEFAULT_MAX_POSTS_PER_TARGET").unwrap_or(20) as usize,
            max_targets_per_run: parse_u64("DEFAULT_MAX_TARGETS_PER_RUN").unwrap_or(5) as usize,
        };

        let directories = DirectoryConfig {
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "posts.db".to_string()),
            targets_filename: env::var("TARGETS_FILENAME")
                .unwrap_or_else(|_| "targets.json".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            llm,
            browser,
            collection,
            directories,
            logging,
        })
    }
}

fn parse_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok())
}
