//! Text processing utilities.

use std::sync::LazyLock;

use regex::Regex;

/// Tokens shorter than this are dropped.
pub const MIN_TOKEN_LENGTH: usize = 3;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

/// Lowercase, strip non-alphanumeric characters, split on whitespace and drop short tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, "")
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_TOKEN_LENGTH)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("The Quick, brown fox; isn't it? An ox!"),
            vec!["the", "quick", "brown", "fox", "isnt"]
        );
        assert!(tokenize("").is_empty());
        assert!(tokenize("a an to of").is_empty());
        assert!(tokenize("!!! ??? ...").is_empty());
    }

    #[test]
    fn test_tokenize_keeps_digits() {
        assert_eq!(tokenize("Route 101 opened 2024"), vec!["route", "101", "opened", "2024"]);
    }
}
