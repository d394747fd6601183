//! Text helpers shared by the content variants and the evaluation handlers.

use std::collections::HashMap;

const TRIM_CHARS: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Truncate `text` to `max_chars` characters, ending with `...` when cut.
///
/// Counts characters rather than bytes so multi-byte text never splits
/// inside a code point.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Lowercased, punctuation-trimmed tokens of `text`.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.to_lowercase().trim_matches(TRIM_CHARS).to_string())
        .filter(|w| !w.is_empty())
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Frequency-filtered keywords of `text`.
///
/// Keeps tokens longer than 3 characters that occur at least twice, and
/// tokens longer than 6 characters that occur once. Order is first
/// occurrence, so the result is stable across runs.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for word in tokens(text) {
        if word.chars().count() <= 3 {
            continue;
        }
        let count = counts.entry(word.clone()).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter(|w| counts.get(w).copied().unwrap_or(0) >= 2 || w.chars().count() > 6)
        .collect()
}

/// Append `extra` to `keywords`, skipping exact duplicates.
pub fn merge_keywords(mut keywords: Vec<String>, extra: &[String]) -> Vec<String> {
    for tag in extra {
        let tag = tag.to_lowercase();
        if !tag.is_empty() && !keywords.contains(&tag) {
            keywords.push(tag);
        }
    }
    keywords
}

/// `"instagram"` -> `"Instagram"`.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-folded substring containment of any needle.
pub fn contains_any(haystack_lower: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack_lower.contains(n.as_str()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        let text = "a".repeat(120);
        let out = truncate(&text, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(20);
        let out = truncate(&text, 10);
        assert_eq!(out, format!("{}...", "é".repeat(7)));
    }

    #[test]
    fn test_extract_keywords_frequency_rules() {
        let text = "Model model training. Pipelines are fun, fun fun! tiny";
        let kws = extract_keywords(text);
        // "model" x2 (len 5), "training" (len 8), "pipelines" (len 9)
        assert_eq!(kws, vec!["model", "training", "pipelines"]);
    }

    #[test]
    fn test_extract_keywords_trims_punctuation() {
        let kws = extract_keywords("Innovation! innovation? Innovation;");
        assert_eq!(kws, vec!["innovation"]);
    }

    #[test]
    fn test_merge_keywords_dedups_tags() {
        let merged = merge_keywords(vec!["startup".into()], &["Startup".into(), "AI".into()]);
        assert_eq!(merged, vec!["startup", "ai"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("linkedin"), "Linkedin");
        assert_eq!(capitalize(""), "");
    }
}
