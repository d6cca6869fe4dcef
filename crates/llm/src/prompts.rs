//! Instruction text for DNA extraction.
//!
//! Generation and fit-advice prompts are rendered by the pipeline crate and
//! arrive ready-made on the request.

/// Content types the catalog scores against.
const CONTENT_TYPES: &str = r#"["tool_launch", "tutorial", "opinion", "case_study", "announcement"]"#;

pub(crate) fn dna_extraction(source: &str) -> String {
    format!(
        r#"Analyze the following content and extract its core "DNA".
The DNA is used to rewrite the content for platforms such as Hacker News, Twitter and LinkedIn.

CONTENT:
{source}

Return only a JSON object with these fields:
- value_proposition: one sentence describing the core value
- problem_solved: the pain point it addresses
- technical_details: languages, frameworks or architectural patterns mentioned or implied
- target_audience: who it is specifically for
- key_metrics: numbers, benchmarks or results mentioned
- unique_aspects: what sets it apart from existing solutions
- limitations: trade-offs or missing features mentioned
- content_type: one of {CONTENT_TYPES}
- novelty: "incremental", "notable" or "breakthrough"
- controversy_level: "low", "medium" or "high"
- show_dont_tell: true if the content carries demos, screenshots or metrics
- best_fit_communities: 3-5 specific communities that would care (e.g. "r/rust")"#
    )
}
