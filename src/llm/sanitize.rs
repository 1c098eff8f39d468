//! Output sanitization: garbage detection and taxonomy validation.
//!
//! The model's semantic output is never trusted to be correct; only
//! clearly invalid output is suppressed here.

/// The closed article taxonomy. Immutable; the classify operation may only
/// emit tags from this set.
pub const TAXONOMY: &[&str] = &[
    "politics",
    "economy",
    "health",
    "education",
    "infrastructure",
    "environment",
    "crime",
    "grants",
    "federal",
    "legislation",
    "government",
    "technology",
    "culture",
    "sports",
];

/// Refusal and meta-comment markers, matched literally against lowercased
/// output. Deployment-specific: this list is the default for a bilingual
/// Spanish/English region.
pub const GARBAGE_PHRASES: &[&str] = &[
    "i cannot",
    "i can't",
    "i am unable",
    "i'm unable",
    "i don't have",
    "i do not have",
    "as an ai",
    "as a language model",
    "there is no information",
    "there's no information",
    "no information provided",
    "the provided text",
    "the given text",
    "based on the context",
    "based on the provided",
    "please provide",
    "i'm sorry",
    "i apologize",
    "lo siento",
    "no tengo",
    "no puedo",
    "sin embargo",
    "no hay informacion",
    "no hay información",
    "no se proporciona",
    "como modelo de lenguaje",
    "el texto no",
];

/// True when a response contains a refusal or meta-comment phrase.
pub fn is_garbage(text: &str) -> bool {
    let lower = text.to_lowercase();
    GARBAGE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Trim a summary and suppress it entirely when the garbage detector fires.
/// Callers skip persistence of empty summaries.
pub fn sanitize_summary(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_garbage(trimmed) {
        return String::new();
    }
    trimmed.to_string()
}

/// Validate a comma-separated classify response against the taxonomy.
///
/// Tokens are trimmed of whitespace, quotes, and leading ordinals, then kept
/// only if they equal a taxonomy tag. An empty pass falls back to salvage:
/// the first taxonomy tag contained in each raw token. First occurrence
/// wins on dedup.
pub fn validate_tags(raw: &str) -> Vec<String> {
    let tokens: Vec<String> = raw
        .split(',')
        .map(clean_token)
        .filter(|t| !t.is_empty())
        .collect();

    let mut tags: Vec<String> = tokens
        .iter()
        .filter(|t| TAXONOMY.contains(&t.as_str()))
        .cloned()
        .collect();

    if tags.is_empty() {
        // Salvage pass: a token like "local politics" still carries a tag.
        for token in &tokens {
            if let Some(tag) = TAXONOMY.iter().find(|tag| token.contains(*tag)) {
                tags.push(tag.to_string());
            }
        }
    }

    dedup_preserving_order(tags)
}

fn clean_token(token: &str) -> String {
    let trimmed = token.trim().trim_matches(|c| c == '"' || c == '\'');
    // Strip leading ordinals: "1. politics", "2) economy", "- health".
    trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit() || c.is_ascii_punctuation() || c.is_whitespace())
        .trim_end()
        .to_lowercase()
}

/// Parse an entity-extraction response: comma-separated names, with the
/// literal "none" dropped.
pub fn parse_entities(raw: &str) -> Vec<String> {
    dedup_preserving_order(
        raw.split(',')
            .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("none"))
            .collect(),
    )
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
