use serde::Deserialize;

/// Tag attached to the substitute analysis when a provider's output
/// carried no parseable JSON, so the degradation stays auditable.
pub const PARSE_ERROR_TAG: &str = "llm_parse_error";

/// The fixed shape a scoring provider is asked to answer with.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAnalysis {
    pub score: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub fact_check_questions: Vec<String>,
}

/// Providers are free-text generators, so the JSON object is fished out
/// of whatever surrounds it. An unextractable object yields a neutral
/// substitute result tagged `llm_parse_error` — a typed outcome the
/// blend still runs on, never a silent success.
pub fn parse_analysis(raw: &str) -> ProviderAnalysis {
    extract_json(raw).unwrap_or_else(|| ProviderAnalysis {
        score: 50,
        tags: vec![PARSE_ERROR_TAG.to_string()],
        rationale: "Failed to parse LLM response".to_string(),
        fact_check_questions: Vec::new(),
    })
}

fn extract_json(raw: &str) -> Option<ProviderAnalysis> {
    let stripped = strip_code_blocks(raw);
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

/// Strip markdown code fences some models wrap their JSON in.
fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_surrounded_by_prose() {
        let raw = "Sure, here is the analysis:\n{\"score\": 72, \"tags\": [\"unverified_claim\"], \"rationale\": \"No sources.\", \"fact_check_questions\": [\"Who said this?\"]}\nLet me know if you need more.";
        let analysis = parse_analysis(raw);
        assert_eq!(analysis.score, 72);
        assert_eq!(analysis.tags, vec!["unverified_claim"]);
        assert_eq!(analysis.fact_check_questions.len(), 1);
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"score\": 10}\n```";
        let analysis = parse_analysis(raw);
        assert_eq!(analysis.score, 10);
        assert!(analysis.tags.is_empty());
    }

    #[test]
    fn unparseable_output_becomes_tagged_substitute() {
        for raw in ["no json here at all", "", "{broken", "}{"] {
            let analysis = parse_analysis(raw);
            assert_eq!(analysis.score, 50);
            assert_eq!(analysis.tags, vec![PARSE_ERROR_TAG]);
        }
    }

    #[test]
    fn missing_score_counts_as_malformed() {
        let analysis = parse_analysis("{\"tags\": [\"x\"]}");
        assert_eq!(analysis.tags, vec![PARSE_ERROR_TAG]);
    }
}
