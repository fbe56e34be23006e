//! Keyword re-ranking over an already retrieved top-K.
//!
//! Each query keyword adds `0.1` per occurrence in the content (at most three
//! counted) and `0.15` if it appears in the source location. The full query
//! found verbatim in the content adds `0.25`. The summed boost is scaled by
//! the configured weight and the final score is capped at `1.0`.

use docvec_core::types::SearchResult;

const STOP_WORDS: &[&str] = &[
    "i", "need", "my", "the", "a", "an", "for", "on", "with", "to", "at", "in", "is", "are",
    "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "should", "could", "may", "might", "must", "can", "this", "that", "these", "those",
    "and", "or", "but", "if", "then", "else", "when", "where", "why", "how", "what", "which",
    "who", "whom", "whose", "about", "above", "across", "after", "against", "along", "among",
    "around", "before", "behind", "below", "beneath", "beside", "between", "beyond", "during",
    "except", "inside", "into", "near", "outside", "over", "since", "through", "throughout",
    "under", "until", "upon", "within", "without",
];

const PER_OCCURRENCE: f32 = 0.1;
const MAX_OCCURRENCES: usize = 3;
const LOCATION_MATCH: f32 = 0.15;
const PHRASE_MATCH: f32 = 0.25;

/// Lowercased query words with punctuation stripped, minus short tokens and
/// stop words. Order and duplicates are preserved.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect::<String>())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Raw (unweighted) boost for one result.
pub fn keyword_boost(result: &SearchResult, keywords: &[String], query_lower: &str) -> f32 {
    let content = result.payload.content.to_lowercase();
    let location = result.payload.source_location.to_lowercase();
    let mut boost = 0.0;
    for keyword in keywords {
        let hits = content.matches(keyword.as_str()).count();
        boost += PER_OCCURRENCE * hits.min(MAX_OCCURRENCES) as f32;
        if location.contains(keyword.as_str()) {
            boost += LOCATION_MATCH;
        }
    }
    if !query_lower.trim().is_empty() && content.contains(query_lower) {
        boost += PHRASE_MATCH;
    }
    boost
}

/// Apply boosting and re-sort. Ties keep their retrieval order.
pub fn apply_keyword_boost(results: Vec<SearchResult>, query: &str, weight: f32) -> Vec<SearchResult> {
    let keywords = extract_keywords(query);
    let query_lower = query.to_lowercase();
    let mut boosted: Vec<SearchResult> = results
        .into_iter()
        .map(|mut r| {
            let boost = keyword_boost(&r, &keywords, &query_lower);
            r.score = (r.score + boost * weight).min(1.0);
            r
        })
        .collect();
    boosted.sort_by(|a, b| b.score.total_cmp(&a.score));
    boosted
}
