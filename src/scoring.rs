use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    ai::{parse::parse_analysis, AnalysisRequest, TextAnalysisProvider},
    domain::ScoreResult,
    util::truncate_chars,
};

/// Blend weights are contractual: 40% heuristic, 60% provider.
pub const HEURISTIC_BLEND_WEIGHT: f64 = 0.4;
pub const PROVIDER_BLEND_WEIGHT: f64 = 0.6;

const SCORING_SYSTEM_PROMPT: &str = "You are a fact-checking assistant. Analyze social media \
posts for misinformation indicators and respond ONLY with valid JSON.";

static SENSATIONAL_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"they don't want you to know",
        r"msm won't (report|cover|tell)",
        r"share before (deleted|removed|banned)",
        r"doctors hate (this|him|her)",
        r"one weird trick",
        r"you won't believe",
        r"shocking truth",
        r"wake up (people|sheeple|sheep)",
        r"do your own research",
        r"the truth they're hiding",
        r"mainstream media (won't|refuses|ignores)",
        r"big pharma doesn't want",
        r"follow the money",
        r"open your eyes",
    ])
});

static VAGUE_SOURCE_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"someone said",
        r"people are saying",
        r"i heard that",
        r"word on the street",
        r"sources say",
        r"according to (sources|insiders)",
        r"trust me",
    ])
});

static CONSPIRACY_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"false flag",
        r"crisis actor",
        r"paid (shill|actor)s?",
        r"deep state",
        r"new world order",
        r"agenda \d+",
        r"they're trying to",
        r"wake up",
    ])
});

static URGENCY_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"act now",
        r"time is running out",
        r"before it's too late",
        r"hurry",
        r"limited time",
    ])
});

static EMOTION_WORDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"horrifying",
        r"terrifying",
        r"outrageous",
        r"disgusting",
        r"unbelievable",
        r"shocking",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid heuristic pattern"))
        .collect()
}

pub struct MisinfoScorer {
    provider: Arc<dyn TextAnalysisProvider>,
}

impl MisinfoScorer {
    pub fn new(provider: Arc<dyn TextAnalysisProvider>) -> Self {
        Self { provider }
    }

    /// Scores one post. With an enabled provider the heuristic result is
    /// blended with the provider's; a provider failure silently degrades
    /// to the heuristic-only result — callers never see it as an error.
    pub async fn score_post(&self, text: &str) -> ScoreResult {
        if text.is_empty() {
            return ScoreResult {
                score: 0,
                tags: Vec::new(),
                rationale: "No text content to analyze".to_string(),
                fact_check_questions: Vec::new(),
            };
        }

        let (heuristic_score, heuristic_tags) = heuristic_score(text);

        if self.provider.is_enabled() {
            let request = AnalysisRequest {
                system: SCORING_SYSTEM_PROMPT.to_string(),
                prompt: build_scoring_prompt(text, heuristic_score, &heuristic_tags),
                temperature: 0.3,
                max_tokens: 500,
            };
            match self.provider.analyze(&request).await {
                Ok(raw) => {
                    let analysis = parse_analysis(&raw);
                    let provider_score = analysis.score.clamp(0, 100);
                    let mut tags = heuristic_tags.clone();
                    for tag in analysis.tags {
                        if !tags.contains(&tag) {
                            tags.push(tag);
                        }
                    }
                    let mut questions = analysis.fact_check_questions;
                    questions.truncate(3);
                    return ScoreResult {
                        score: blend_scores(heuristic_score, provider_score),
                        tags,
                        rationale: analysis.rationale,
                        fact_check_questions: questions,
                    };
                }
                Err(err) => {
                    tracing::warn!(
                        target: "scoring",
                        provider = self.provider.name(),
                        error = %err,
                        "provider scoring failed, using heuristics only"
                    );
                }
            }
        }

        let rationale = heuristic_rationale(&heuristic_tags);
        let fact_check_questions = heuristic_questions(text, &heuristic_tags);
        ScoreResult {
            score: heuristic_score,
            tags: heuristic_tags,
            rationale,
            fact_check_questions,
        }
    }
}

pub fn blend_scores(heuristic: i64, provider: i64) -> i64 {
    (heuristic as f64 * HEURISTIC_BLEND_WEIGHT + provider as f64 * PROVIDER_BLEND_WEIGHT).round()
        as i64
}

/// Pattern-rule score over a single text blob. Deterministic, no
/// external calls; each signal contributes at most once and the sum is
/// clamped to 100.
pub fn heuristic_score(text: &str) -> (i64, Vec<String>) {
    let text_lower = text.to_lowercase();
    let mut score: i64 = 0;
    let mut tags: Vec<String> = Vec::new();

    let total_chars = text.chars().count().max(1);
    let upper_chars = text.chars().filter(|c| c.is_uppercase()).count();
    if upper_chars as f64 / total_chars as f64 > 0.3 {
        score += 15;
        tags.push("excessive_caps".to_string());
    }

    let exclamations = text.matches('!').count() as i64;
    if exclamations > 3 {
        score += (10 + exclamations * 2).min(25);
        tags.push("excessive_punctuation".to_string());
    }

    if SENSATIONAL_PHRASES.iter().any(|p| p.is_match(&text_lower)) {
        score += 20;
        tags.push("sensational_language".to_string());
    }

    if VAGUE_SOURCE_PHRASES.iter().any(|p| p.is_match(&text_lower)) {
        score += 15;
        tags.push("vague_sources".to_string());
    }

    let conspiracy_matches = CONSPIRACY_MARKERS
        .iter()
        .filter(|p| p.is_match(&text_lower))
        .count() as i64;
    if conspiracy_matches > 0 {
        score += (conspiracy_matches * 15).min(30);
        tags.push("conspiracy_theory".to_string());
    }

    if URGENCY_PHRASES.iter().any(|p| p.is_match(&text_lower)) {
        score += 10;
        tags.push("urgency_manipulation".to_string());
    }

    let emotion_count = EMOTION_WORDS
        .iter()
        .filter(|p| p.is_match(&text_lower))
        .count();
    if emotion_count >= 2 {
        score += 15;
        tags.push("emotional_manipulation".to_string());
    }

    (score.min(100), tags)
}

fn build_scoring_prompt(text: &str, heuristic_score: i64, heuristic_tags: &[String]) -> String {
    format!(
        "Analyze this social media post for misinformation indicators.\n\n\
         Post content:\n{content}\n\n\
         Heuristic analysis found a score of {score}/100 with tags: {tags}\n\n\
         Provide your analysis as JSON with:\n\
         - score (0-100): likelihood of misinformation\n\
         - tags (array): descriptive tags like \"unverified_claim\", \"misleading_statistics\", etc.\n\
         - rationale (string): 1-2 sentences explaining the score\n\
         - fact_check_questions (array): 3 specific questions to verify claims\n\n\
         Respond with ONLY valid JSON, no other text.",
        content = truncate_chars(text, 1000),
        score = heuristic_score,
        tags = heuristic_tags.join(", "),
    )
}

fn heuristic_rationale(tags: &[String]) -> String {
    if tags.is_empty() {
        return "No significant misinformation indicators detected.".to_string();
    }
    let explanations: Vec<&str> = tags.iter().take(3).map(|tag| explain_tag(tag)).collect();
    format!("{}.", explanations.join(". "))
}

fn explain_tag(tag: &str) -> &str {
    match tag {
        "excessive_caps" => "Contains excessive capitalization",
        "excessive_punctuation" => "Uses excessive punctuation marks",
        "sensational_language" => "Uses sensational or clickbait language",
        "vague_sources" => "Lacks specific credible sources",
        "conspiracy_theory" => "Contains conspiracy theory markers",
        "urgency_manipulation" => "Uses urgency to pressure action",
        "emotional_manipulation" => "Uses emotional manipulation tactics",
        other => other,
    }
}

fn heuristic_questions(text: &str, tags: &[String]) -> Vec<String> {
    let mut questions = Vec::new();
    let has = |tag: &str| tags.iter().any(|t| t == tag);

    if has("vague_sources") {
        questions.push("What are the specific, named sources for these claims?".to_string());
    }
    if has("conspiracy_theory") || has("sensational_language") {
        questions.push("What credible evidence supports this claim?".to_string());
        questions.push("Have mainstream fact-checkers investigated this?".to_string());
    }

    // Strong assertions in the opening sentences get a targeted
    // verification question.
    for sentence in text.split('.').take(2) {
        let lower = sentence.to_lowercase();
        if ["proof", "evidence", "study", "research"]
            .iter()
            .any(|word| lower.contains(word))
        {
            questions.push(format!(
                "Can you verify: {}?",
                truncate_chars(sentence.trim(), 100)
            ));
            break;
        }
    }

    questions.truncate(3);
    questions
}
