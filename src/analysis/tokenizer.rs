use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::Token;

/// A tokenizer turns raw text into an ordered sequence of tokens. Filters
/// run afterwards; a tokenizer never removes or stems tokens, it only
/// decides where the boundaries are. Tokenizers carry no mutable state,
/// so a single `Arc<dyn Tokenizer>` is shared read-only across indexing
/// workers rather than cloned per worker.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Splits on Unicode word boundaries, with optional special-character
/// stripping (via a regex character class) and optional lowercasing.
pub struct StandardTokenizer {
    pub lowercase: bool,
    pub strip_chars: Option<Regex>,
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            lowercase: true,
            strip_chars: None,
            max_token_length: 255,
        }
    }
}

impl StandardTokenizer {
    pub fn with_strip_chars(pattern: &str) -> Result<Self, regex::Error> {
        Ok(StandardTokenizer {
            strip_chars: Some(Regex::new(pattern)?),
            ..StandardTokenizer::default()
        })
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;
        let mut offset = 0usize;

        for word in text.unicode_words() {
            let cleaned = match &self.strip_chars {
                Some(re) => re.replace_all(word, "").into_owned(),
                None => word.to_string(),
            };

            if !cleaned.is_empty() && cleaned.len() <= self.max_token_length {
                let token_text = if self.lowercase {
                    cleaned.to_lowercase()
                } else {
                    cleaned
                };

                tokens.push(Token::new(token_text, position, offset));
                position += 1;
            }

            offset += word.len();
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Splits only on whitespace; no Unicode word-boundary detection.
pub struct WhitespaceTokenizer {
    pub lowercase: bool,
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        WhitespaceTokenizer { lowercase: false }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;
        let mut offset = 0usize;

        for word in text.split_whitespace() {
            let token_text = if self.lowercase {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            tokens.push(Token::new(token_text, position, offset));
            position += 1;
            offset += word.len();
        }

        tokens
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// The whole (trimmed) input becomes a single token. Used by the `keyword`
/// analyzer for exact-match fields.
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![Token::new(trimmed.to_string(), 0, 0)]
        }
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Sliding-window character n-grams over the whole input (not per word),
/// covering `[min_gram..=max_gram]`. E.g. `"Hello"` with `min_gram=2,
/// max_gram=3` yields `he, hel, el, ell, ll, llo, lo`.
pub struct NGramTokenizer {
    pub min_gram: usize,
    pub max_gram: usize,
    pub lowercase: bool,
}

impl Default for NGramTokenizer {
    fn default() -> Self {
        NGramTokenizer {
            min_gram: 2,
            max_gram: 3,
            lowercase: true,
        }
    }
}

impl Tokenizer for NGramTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let normalized = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let chars: Vec<char> = normalized.chars().collect();

        let mut tokens = Vec::new();
        let mut position = 0u32;

        for start in 0..chars.len() {
            if start >= chars.len() {
                break;
            }
            let max_n = self.max_gram.min(chars.len() - start);
            if max_n < self.min_gram {
                continue;
            }
            for n in self.min_gram..=max_n {
                let gram: String = chars[start..start + n].iter().collect();
                tokens.push(Token::new(gram, position, start));
                position += 1;
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "ngram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tokenizer_lowercases_and_splits_on_word_boundaries() {
        let tokenizer = StandardTokenizer::default();
        let tokens = tokenizer.tokenize("Hello, World!");
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["hello", "world"]);
    }

    #[test]
    fn whitespace_tokenizer_does_not_split_punctuation() {
        let tokenizer = WhitespaceTokenizer::default();
        let tokens = tokenizer.tokenize("foo, bar!");
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["foo,", "bar!"]);
    }

    #[test]
    fn keyword_tokenizer_trims_and_keeps_one_token() {
        let tokens = KeywordTokenizer.tokenize("  Lagos, Nigeria  ");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "Lagos, Nigeria");
    }

    #[test]
    fn ngram_tokenizer_matches_spec_s3() {
        let tokenizer = NGramTokenizer::default();
        let tokens = tokenizer.tokenize("Hello");
        let grams: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(grams, vec!["he", "hel", "el", "ell", "ll", "llo", "lo"]);
    }
}
