mod anthropic;
mod mock;
mod ollama;
mod openai;
pub mod parse;
mod provider;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{build_provider, AnalysisRequest, TextAnalysisProvider};
