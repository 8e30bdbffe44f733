//! Search-term extraction from natural-language queries.
//!
//! Queries are normalised into stopword-filtered term sets, used both for
//! object-level semantic search and as fuzzy cache keys. The stopword list
//! mixes ordinary English function words with the request verbs ("show me",
//! "list all", "located in") that carry no schema signal.

use std::collections::BTreeSet;

/// Words dropped during term extraction.
const STOPWORDS: [&str; 58] = [
    "a", "an", "the", "of", "in", "on", "at", "to", "for", "with", "by", "from", "as", "and",
    "or", "not", "is", "are", "was", "were", "be", "been", "do", "does", "did", "have", "has",
    "had", "i", "we", "us", "my", "our", "you", "your", "it", "its", "this", "that", "these",
    "those", "what", "which", "who", "whose", "how", "all", "any", "each", "show", "me", "list",
    "give", "get", "find", "display", "please", "located",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lowercased, stopword-filtered term set for a query.
///
/// This is the normal form used for cache-key comparison: ordering and
/// duplicates are irrelevant, so the result is a set.
pub fn normalize_terms(query: &str) -> BTreeSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 1 && !is_stopword(w))
        .collect()
}

/// Search terms for object-level semantic search: the normalised term set
/// plus any capitalised multi-word spans (candidate proper nouns),
/// deduplicated.
pub fn extract_search_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = normalize_terms(query).into_iter().collect();

    for span in capitalized_spans(query) {
        let lowered = span.to_lowercase();
        if !terms.contains(&lowered) && !terms.contains(&span) {
            terms.push(span);
        }
    }

    terms
}

/// Runs of two or more consecutive capitalised words ("Acme Corp",
/// "Global Media Holdings").
fn capitalized_spans(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in words {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        let capitalized = trimmed
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);

        if capitalized {
            current.push(trimmed);
        } else {
            if current.len() >= 2 {
                spans.push(current.join(" "));
            }
            current.clear();
        }
    }
    if current.len() >= 2 {
        spans.push(current.join(" "));
    }

    spans
}

/// Jaccard similarity between two term sets.
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_normalize_strips_stopwords_and_case() {
        let terms = normalize_terms("Show me all accounts located in California");
        assert_eq!(terms, set(&["accounts", "california"]));
    }

    #[test]
    fn test_normalize_keeps_underscored_api_names() {
        let terms = normalize_terms("filter by Invoice_Line_Item__c status");
        assert!(terms.contains("invoice_line_item__c"));
        assert!(terms.contains("status"));
    }

    #[test]
    fn test_capitalized_spans_need_two_words() {
        let spans = capitalized_spans("deals with Acme Corp and Initech");
        assert_eq!(spans, vec!["Acme Corp"]);
    }

    #[test]
    fn test_extract_terms_includes_proper_noun_spans() {
        let terms = extract_search_terms("open opportunities at Globex Holdings");
        assert!(terms.contains(&"opportunities".to_string()));
        assert!(terms.contains(&"Globex Holdings".to_string()));
    }

    #[test]
    fn test_jaccard_similarity_bounds() {
        let a = set(&["accounts", "california"]);
        let b = set(&["accounts", "california"]);
        assert!((jaccard_similarity(&a, &b) - 1.0).abs() < f64::EPSILON);

        let c = set(&["opportunities", "quarter"]);
        assert_eq!(jaccard_similarity(&a, &c), 0.0);

        let d = set(&["accounts", "california", "open"]);
        let sim = jaccard_similarity(&a, &d);
        assert!(sim > 0.6 && sim < 0.7);
    }

    #[test]
    fn test_spec_queries_cross_threshold() {
        // These two phrasings must land on the same cached context.
        let a = normalize_terms("show accounts in california");
        let b = normalize_terms("show me accounts located in california");
        assert!(jaccard_similarity(&a, &b) >= 0.8);

        // And this one must not.
        let c = normalize_terms("list all opportunities closing this quarter");
        assert!(jaccard_similarity(&a, &c) < 0.8);
    }
}
