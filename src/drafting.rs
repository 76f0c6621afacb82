use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    ai::{AnalysisRequest, TextAnalysisProvider},
    util::truncate_chars,
};

const DRAFTING_SYSTEM_PROMPT: &str = "You are a fact-checker helping draft respectful but firm \
rebuttals to misinformation.";

/// Fragments shorter than this are treated as separator debris, not
/// drafts.
const MIN_DRAFT_CHARS: usize = 20;

static DRAFT_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"---+|DRAFT \d+[:\-]").expect("valid draft separator pattern"));

/// Produces the three rebuttal styles: short punchy, factual calm,
/// snarky but appropriate. Drafting never fails — worst case is the
/// deterministic template set.
pub struct RebuttalDrafter {
    provider: Arc<dyn TextAnalysisProvider>,
}

impl RebuttalDrafter {
    pub fn new(provider: Arc<dyn TextAnalysisProvider>) -> Self {
        Self { provider }
    }

    pub async fn generate_drafts(
        &self,
        post_text: &str,
        tags: &[String],
        rationale: &str,
    ) -> [String; 3] {
        if post_text.is_empty() {
            return [
                "No content to respond to.".to_string(),
                "No content to respond to.".to_string(),
                "No content to respond to.".to_string(),
            ];
        }

        if self.provider.is_enabled() {
            let request = AnalysisRequest {
                system: DRAFTING_SYSTEM_PROMPT.to_string(),
                prompt: build_drafting_prompt(post_text, tags, rationale),
                temperature: 0.7,
                max_tokens: 800,
            };
            match self.provider.analyze(&request).await {
                Ok(raw) => return parse_drafts(&raw),
                Err(err) => {
                    tracing::warn!(
                        target: "drafting",
                        provider = self.provider.name(),
                        error = %err,
                        "provider drafting failed, using templates"
                    );
                }
            }
        }

        template_drafts(post_text, tags)
    }
}

fn build_drafting_prompt(post_text: &str, tags: &[String], rationale: &str) -> String {
    let tags_str = if tags.is_empty() {
        "none identified".to_string()
    } else {
        tags.join(", ")
    };

    format!(
        "Generate 3 different rebuttal drafts for this social media post that contains \
         potential misinformation.\n\n\
         Original post:\n{content}\n\n\
         Analysis: {rationale}\n\
         Tags: {tags_str}\n\n\
         Generate exactly 3 drafts with these styles:\n\n\
         DRAFT 1 - Short Punchy:\n\
         A brief, direct response (2-3 sentences max). Cut through the nonsense quickly. No fluff.\n\n\
         DRAFT 2 - Factual Calm:\n\
         A measured, evidence-based response. Use \"what we know / what we don't know\" framework. \
         Calm and educational tone. 3-4 sentences.\n\n\
         DRAFT 3 - Snarky But Appropriate:\n\
         A response with personality and a bit of snark, but NO slurs, threats, or personal \
         attacks. Sound like a real person, not corporate. Still fact-based. 3-4 sentences.\n\n\
         IMPORTANT FORMATTING:\n\
         - NO bullet points or dashes\n\
         - Use short paragraphs only\n\
         - Sound natural and conversational\n\
         - Separate each draft with \"---\"\n\n\
         Generate the 3 drafts now:",
        content = truncate_chars(post_text, 800),
    )
}

/// Splits a provider response into 3 drafts. Missing drafts are padded
/// by repeating the first; a completely unusable response falls back to
/// the generic set.
fn parse_drafts(response: &str) -> [String; 3] {
    let mut drafts: Vec<String> = DRAFT_SPLIT
        .split(response)
        .map(str::trim)
        .filter(|part| part.chars().count() > MIN_DRAFT_CHARS)
        .map(str::to_string)
        .collect();

    if drafts.is_empty() {
        return fallback_drafts();
    }
    while drafts.len() < 3 {
        drafts.push(drafts[0].clone());
    }
    drafts.truncate(3);
    <[String; 3]>::try_from(drafts).unwrap_or_else(|_| fallback_drafts())
}

fn fallback_drafts() -> [String; 3] {
    [
        "This claim needs verification. Do you have credible sources?".to_string(),
        "I'm skeptical of this claim. Here's what we actually know based on reliable sources."
            .to_string(),
        "Cool story, but gonna need some actual evidence on this one.".to_string(),
    ]
}

/// Rule-based drafts for the no-provider path. The pool index derives
/// from the text length, so identical input always drafts identically.
fn template_drafts(post_text: &str, tags: &[String]) -> [String; 3] {
    let has = |tag: &str| tags.iter().any(|t| t == tag);
    let text_len = post_text.chars().count();

    let draft1 = match text_len % 4 {
        0 => format!(
            "Got a source for that? This sounds like {}.",
            tags.first().map(String::as_str).unwrap_or("misinformation")
        ),
        1 => "That's not accurate. Please verify your sources before sharing.".to_string(),
        2 => "Hold up. Where's the evidence for this claim?".to_string(),
        _ => "This has been debunked multiple times. Check reputable fact-checkers.".to_string(),
    };

    let draft2 = if has("vague_sources") || has("conspiracy_theory") {
        "I'd like to see the evidence for this claim. What we know from credible sources is \
         often different from what gets shared on social media. What we don't know is whether \
         this specific claim has been verified by reputable fact-checkers. Can you share your \
         sources?"
            .to_string()
    } else if has("sensational_language") {
        "This appears to use sensational language to grab attention. When checking claims like \
         these, it's important to look for peer-reviewed research, statements from domain \
         experts, and fact-checker analysis. What credible sources support this?"
            .to_string()
    } else {
        "This claim warrants skepticism. What we know is that extraordinary claims require \
         extraordinary evidence. What we don't know is whether this has been verified by \
         reliable sources. I'd encourage everyone to fact-check before sharing."
            .to_string()
    };

    let draft3 = if has("conspiracy_theory") {
        "Okay so this is conspiracy theory territory. If there's actual evidence, please share \
         it from credible sources. Otherwise this is just creative fiction."
            .to_string()
    } else if has("emotional_manipulation") {
        "The emotional manipulation here is pretty obvious. Real facts don't need this much \
         drama. Got any actual evidence?"
            .to_string()
    } else {
        match text_len % 4 {
            0 => "My dude, you can't just say stuff like this without receipts. Where's the \
                  actual proof?"
                .to_string(),
            1 => "Yeah, I'm gonna need to see some real sources here because this sounds \
                  completely made up."
                .to_string(),
            2 => "Love how this conveniently has zero credible sources. Almost like it's not \
                  true. Wild."
                .to_string(),
            _ => "This is the kind of thing that sounds dramatic but falls apart the second you \
                  actually look into it. Try fact-checking."
                .to_string(),
        }
    };

    [draft1, draft2, draft3]
}
