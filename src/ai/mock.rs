use anyhow::Result;
use async_trait::async_trait;

use super::provider::{AnalysisRequest, TextAnalysisProvider};

/// Stand-in used when no provider is configured. It reports itself
/// disabled, which keeps scoring and drafting on their deterministic
/// paths; the canned response only exists for callers that ignore
/// `is_enabled`.
pub struct MockProvider;

#[async_trait]
impl TextAnalysisProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<String> {
        Ok(r#"{"score": 0, "tags": [], "rationale": "Text analysis disabled", "fact_check_questions": []}"#
            .to_string())
    }
}
