use serde::{Deserialize, Serialize};

/// A post as it comes out of extraction, before persistence. The
/// extractor guarantees `text_content` is at least 20 characters.
#[derive(Debug, Clone)]
pub struct RawPost {
    pub text_content: String,
    pub author: Option<String>,
    pub url: Option<String>,
}

/// Output of the scorer: heuristic-only, or a heuristic/provider blend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    pub score: i64,
    pub tags: Vec<String>,
    pub rationale: String,
    pub fact_check_questions: Vec<String>,
}

/// A named source to collect posts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default = "default_target_kind")]
    pub kind: String,
}

fn default_target_kind() -> String {
    "page".to_string()
}

/// Outcome of a collection run. `errors` is the only channel reporting
/// partial failure; a target's entry never aborts the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub targets_processed: usize,
    pub posts_collected: usize,
    pub errors: Vec<String>,
}
