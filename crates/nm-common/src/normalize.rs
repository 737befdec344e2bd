use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Comparison key for user-entered text: NFKC, trimmed, lower-cased.
///
/// Full-width and half-width spellings ("ＲＵＳＴ" / "rust") share a key.
pub fn fold_key(value: &str) -> String {
    value.nfkc().collect::<String>().trim().to_lowercase()
}

/// Case-insensitive containment on folded keys.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    let needle = fold_key(needle);
    !needle.is_empty() && fold_key(haystack).contains(&needle)
}

/// Trim entries, drop blanks and keep the first spelling of case-insensitive duplicates.
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(fold_key(value)))
        .collect()
}

pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_key_handles_width_and_case() {
        assert_eq!(fold_key(" ＲＵＳＴ "), "rust");
        assert_eq!(fold_key("Node.JS"), "node.js");
    }

    #[test]
    fn contains_folded_ignores_empty_needle() {
        assert!(contains_folded("Senior Backend Engineer", "backend"));
        assert!(!contains_folded("Senior Backend Engineer", "  "));
    }

    #[test]
    fn clean_list_keeps_first_spelling() {
        let cleaned = clean_list(vec![
            "AI".into(),
            " ai ".into(),
            "Travel".into(),
            "\t".into(),
        ]);
        assert_eq!(cleaned, vec!["AI".to_string(), "Travel".to_string()]);
    }
}
