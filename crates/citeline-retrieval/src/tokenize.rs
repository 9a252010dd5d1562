//! Query and chunk tokenization.
//!
//! The lexical index and the query side must tokenize identically, so both
//! go through [`tokenize`]. Lowercase, alphanumeric word extraction; terms
//! shorter than two characters and stopwords are dropped.

/// Common English stopwords excluded from term scoring.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "their", "there", "these", "this", "to",
    "was", "were", "what", "when", "where", "which", "who", "why", "will", "with", "how", "does",
    "do", "did", "can",
];

/// Tokenize text into lowercase alphanumeric terms.
///
/// Punctuation-only or empty input produces an empty list; callers treat
/// that as "nothing to match", never as an error.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Tokenize and deduplicate, preserving first-seen order.
pub fn unique_terms(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits() {
        let terms = tokenize("Optimal Temperature is 37C");
        assert_eq!(terms, vec!["optimal", "temperature", "37c"]);
    }

    #[test]
    fn tokenize_punctuation_only_is_empty() {
        assert!(tokenize("?!., ---").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn tokenize_drops_stopwords() {
        let terms = tokenize("what is the AUROC of the model");
        assert_eq!(terms, vec!["auroc", "model"]);
    }

    #[test]
    fn tokenize_drops_single_chars() {
        let terms = tokenize("p < 0.05 x y");
        assert_eq!(terms, vec!["05"]);
    }

    #[test]
    fn unique_terms_deduplicates_in_order() {
        let terms = unique_terms("model model accuracy model");
        assert_eq!(terms, vec!["model", "accuracy"]);
    }
}
