use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Review state of a collected post. Transitions happen only through
/// explicit review actions; nothing moves a post automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Queued,
    Done,
    Skip,
    NeedsResearch,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Queued => "queued",
            PostStatus::Done => "done",
            PostStatus::Skip => "skip",
            PostStatus::NeedsResearch => "needs_research",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown post status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for PostStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "queued" => Ok(PostStatus::Queued),
            "done" => Ok(PostStatus::Done),
            "skip" => Ok(PostStatus::Skip),
            "needs_research" => Ok(PostStatus::NeedsResearch),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A persisted post. Identity and status are owned by the store.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub target_name: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub post_timestamp: Option<String>,
    pub text_content: String,
    /// Bare file name under the screenshots directory.
    pub screenshot_path: Option<String>,
    pub status: PostStatus,
    pub misinfo_score: Option<i64>,
    pub tags: Vec<String>,
    pub rationale: Option<String>,
    pub fact_check_questions: Vec<String>,
    /// Exactly 3 entries when present: short punchy, factual calm, snarky.
    pub drafts: Option<Vec<String>>,
    pub collected_at: DateTime<Utc>,
}

/// Partial update for a post. Only the fields listed here are mutable;
/// everything else (id, target_name, screenshot_path, collected_at) is
/// fixed at insert time.
#[derive(Debug, Default, Clone)]
pub struct PostUpdate {
    pub status: Option<PostStatus>,
    pub misinfo_score: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub rationale: Option<String>,
    pub fact_check_questions: Option<Vec<String>>,
    pub drafts: Option<Vec<String>>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub post_timestamp: Option<String>,
    pub text_content: Option<String>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.misinfo_score.is_none()
            && self.tags.is_none()
            && self.rationale.is_none()
            && self.fact_check_questions.is_none()
            && self.drafts.is_none()
            && self.url.is_none()
            && self.author.is_none()
            && self.post_timestamp.is_none()
            && self.text_content.is_none()
    }

    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            PostStatus::Queued,
            PostStatus::Done,
            PostStatus::Skip,
            PostStatus::NeedsResearch,
        ] {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("archived".parse::<PostStatus>().is_err());
        assert!("QUEUED".parse::<PostStatus>().is_err());
    }
}
