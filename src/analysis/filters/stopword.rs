use std::collections::HashSet;

use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Removes tokens found in a stopword set.
///
/// `StopWordFilter::english()` is the single canonical English list; every
/// predefined analyzer that wants English stopwords builds on it.
pub struct StopWordFilter {
    pub stop_words: HashSet<String>,
}

impl StopWordFilter {
    pub fn new(stop_words: Vec<String>) -> Self {
        StopWordFilter {
            stop_words: stop_words.into_iter().collect(),
        }
    }

    pub fn english() -> Self {
        let words = vec![
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in",
            "is", "it", "its", "of", "on", "that", "the", "this", "to", "was", "will", "with",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        StopWordFilter::new(words)
    }
}

impl TokenFilter for StopWordFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|token| !self.stop_words.contains(&token.text))
            .collect()
    }

    fn name(&self) -> &str {
        "stopword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_configured_stopwords_only() {
        let filter = StopWordFilter::english();
        let tokens = vec![
            Token::new("this".into(), 0, 0),
            Token::new("hello".into(), 1, 0),
            Token::new("is".into(), 2, 0),
            Token::new("a".into(), 3, 0),
            Token::new("test".into(), 4, 0),
            Token::new("with".into(), 5, 0),
            Token::new("words".into(), 6, 0),
        ];

        let filtered = filter.filter(tokens);
        let words: Vec<&str> = filtered.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["hello", "test", "words"]);
    }
}
