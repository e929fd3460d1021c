use rust_stemmers::{Algorithm, Stemmer};

use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

pub struct StemmerFilter {
    pub algorithm: Algorithm,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter { algorithm }
    }
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        let stemmer = Stemmer::create(self.algorithm);

        tokens
            .into_iter()
            .map(|mut token| {
                token.text = stemmer.stem(&token.text).to_string();
                token
            })
            .collect()
    }

    fn name(&self) -> &str {
        "stemmer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porter_stemmer_reduces_words_to_their_common_stem() {
        let filter = StemmerFilter::new(Algorithm::English);
        let tokens: Vec<Token> = ["running", "jumps", "jumped", "flies", "driving", "easily"]
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(w.to_string(), i as u32, 0))
            .collect();

        let stemmed = filter.filter(tokens);
        let words: Vec<&str> = stemmed.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["run", "jump", "jump", "fli", "drive", "easili"]);
    }
}
