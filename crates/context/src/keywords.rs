use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Upper-case words that are prose, not identifiers.
const ACRONYM_STOPWORDS: &[&str] = &[
    "A", "AN", "AND", "ARE", "AS", "AT", "BE", "BUT", "BY", "DO", "FOR", "FYI", "IF", "IN", "IS",
    "IT", "NO", "NOT", "OF", "OK", "ON", "OR", "SO", "THE", "TO", "TODO", "UP", "WE", "WIP",
    "ASAP", "NOTE", "ETA",
];

fn keyword_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // PascalCase, at least two humps; may open with an acronym (HTTPClient)
            r"\b[A-Z][A-Za-z0-9]*[a-z][A-Za-z0-9]*\b",
            // camelCase
            r"\b[a-z][a-z0-9]*(?:[A-Z][a-z0-9]*)+\b",
            // snake_case with two or more segments
            r"\b[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)+\b",
            // dotted.lowercase
            r"\b[a-z][a-z0-9_]+(?:\.[a-z][a-z0-9_]+)+\b",
            // ACRONYM
            r"\b[A-Z]{2,6}\b",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid regex"))
        .collect()
    })
}

const PASCAL_MIN_LEN: usize = 4;

/// Identifier-like tokens of free text in order of first appearance.
///
/// Deduplication is case-insensitive and keeps the first spelling seen.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let mut hits: Vec<(usize, usize, &str)> = Vec::new();
    for (kind, pattern) in keyword_patterns().iter().enumerate() {
        for hit in pattern.find_iter(text) {
            let token = hit.as_str();
            let keep = match kind {
                0 => {
                    token.len() >= PASCAL_MIN_LEN
                        && token.chars().filter(char::is_ascii_uppercase).count() >= 2
                }
                4 => !ACRONYM_STOPWORDS.contains(&token),
                _ => true,
            };
            if keep {
                hits.push((hit.start(), kind, token));
            }
        }
    }
    hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.2.len().cmp(&a.2.len())).then(a.1.cmp(&b.1)));

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for (_, _, token) in hits {
        if keywords.len() >= max_keywords {
            break;
        }
        if seen.insert(token.to_lowercase()) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_identifier_keeps_first_spelling() {
        assert_eq!(
            extract_keywords("FooService and FooService again, fooservice too", 20),
            vec!["FooService"]
        );
    }

    #[test]
    fn recognises_each_identifier_shape() {
        let text = "Fix getUserById in user_repo.py; the PaymentGateway calls load_config and \
                    JWT refresh via app.settings.";
        assert_eq!(
            extract_keywords(text, 20),
            vec![
                "getUserById",
                "user_repo.py",
                "user_repo",
                "PaymentGateway",
                "load_config",
                "JWT",
                "app.settings"
            ]
        );
    }

    #[test]
    fn pascal_case_may_start_with_an_acronym() {
        assert_eq!(
            extract_keywords("Swap the HTTPClient for an XMLParser backed IOReader", 20),
            vec!["HTTPClient", "XMLParser", "IOReader"]
        );
    }

    #[test]
    fn stopwords_and_single_words_are_ignored() {
        assert!(extract_keywords("THE fix is NOT ready AND Simple words Only", 20).is_empty());
    }

    #[test]
    fn caps_at_max_keywords() {
        let text = "AlphaOne BetaTwo GammaThree DeltaFour";
        assert_eq!(extract_keywords(text, 2), vec!["AlphaOne", "BetaTwo"]);
        assert!(extract_keywords(text, 0).is_empty());
    }
}
