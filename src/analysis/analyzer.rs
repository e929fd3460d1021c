use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_stemmers::Algorithm;

use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{
    KeywordTokenizer, NGramTokenizer, StandardTokenizer, Tokenizer, WhitespaceTokenizer,
};
use crate::core::error::{Error, Result};

/// A named `tokenizer -> filter(s)` pipeline: `text -> tokenizer -> filter_1 -> ... -> filter_n -> terms`.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// `standard` tokenizer + `lowercase` + `stopword`.
    pub fn standard() -> Self {
        Analyzer::new("standard".to_string(), Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
    }

    /// `standard` tokenizer + `lowercase`, no stopword removal.
    pub fn simple() -> Self {
        Analyzer::new("simple".to_string(), Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// `whitespace` tokenizer, no filters.
    pub fn whitespace() -> Self {
        Analyzer::new(
            "whitespace".to_string(),
            Box::new(WhitespaceTokenizer::default()),
        )
    }

    /// Whole (trimmed) input as a single token, lowercased. For exact-match fields.
    pub fn keyword() -> Self {
        Analyzer::new("keyword".to_string(), Box::new(KeywordTokenizer))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// `whitespace` tokenizer + `lowercase`.
    pub fn lowercase() -> Self {
        Analyzer::new(
            "lowercase".to_string(),
            Box::new(WhitespaceTokenizer::default()),
        )
        .add_filter(Box::new(LowercaseFilter))
    }

    /// `standard` tokenizer + lowercase + stopword + Porter stemming. Not one of the
    /// predefined registry entries but reachable through a custom analyzer config that
    /// requests the `stemming` filter.
    pub fn standard_stemmed() -> Self {
        Analyzer::new(
            "standard_stemmed".to_string(),
            Box::new(StandardTokenizer::default()),
        )
        .add_filter(Box::new(LowercaseFilter))
        .add_filter(Box::new(StopWordFilter::english()))
        .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }
}

/// Configuration for constructing a custom analyzer: `{name, tokenizer: {type, options},
/// filters: [{type, options}]}`.
pub struct TokenizerConfig {
    pub kind: String,
}

pub struct FilterConfig {
    pub kind: String,
}

pub struct AnalyzerConfig {
    pub name: String,
    pub tokenizer: TokenizerConfig,
    pub filters: Vec<FilterConfig>,
}

impl AnalyzerConfig {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_config("analyzer name must not be empty"));
        }
        if self.tokenizer.kind.trim().is_empty() {
            return Err(Error::invalid_config("analyzer tokenizer type must not be empty"));
        }
        for filter in &self.filters {
            if filter.kind.trim().is_empty() {
                return Err(Error::invalid_config("analyzer filter type must not be empty"));
            }
        }
        Ok(())
    }

    fn build_tokenizer(&self) -> Result<Box<dyn Tokenizer>> {
        match self.tokenizer.kind.as_str() {
            "standard" => Ok(Box::new(StandardTokenizer::default())),
            "whitespace" => Ok(Box::new(WhitespaceTokenizer::default())),
            "keyword" => Ok(Box::new(KeywordTokenizer)),
            "ngram" => Ok(Box::new(NGramTokenizer::default())),
            other => Err(Error::invalid_config(format!("unknown tokenizer type '{other}'"))),
        }
    }

    fn build_filter(kind: &str) -> Result<Box<dyn TokenFilter>> {
        match kind {
            "lowercase" => Ok(Box::new(LowercaseFilter)),
            "stopword" => Ok(Box::new(StopWordFilter::english())),
            "stemming" | "stemmer" => Ok(Box::new(StemmerFilter::new(Algorithm::English))),
            other => Err(Error::invalid_config(format!("unknown filter type '{other}'"))),
        }
    }

    pub fn build(self) -> Result<Analyzer> {
        self.validate()?;
        let mut analyzer = Analyzer::new(self.name.clone(), self.build_tokenizer()?);
        for filter in &self.filters {
            analyzer = analyzer.add_filter(Self::build_filter(&filter.kind)?);
        }
        Ok(analyzer)
    }
}

/// Holds analyzers by name. Duplicate registration is rejected rather than
/// silently overwriting an existing analyzer.
pub struct AnalyzerRegistry {
    analyzers: RwLock<HashMap<String, Arc<Analyzer>>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&self) {
        self.register_unchecked("standard", Analyzer::standard());
        self.register_unchecked("simple", Analyzer::simple());
        self.register_unchecked("whitespace", Analyzer::whitespace());
        self.register_unchecked("keyword", Analyzer::keyword());
        self.register_unchecked("lowercase", Analyzer::lowercase());
    }

    fn register_unchecked(&self, name: &str, analyzer: Analyzer) {
        self.analyzers
            .write()
            .unwrap()
            .insert(name.to_string(), Arc::new(analyzer));
    }

    /// Registers a new analyzer. Fails with `Conflict` if the name is already taken.
    pub fn register(&self, name: &str, analyzer: Analyzer) -> Result<()> {
        let mut analyzers = self.analyzers.write().unwrap();
        if analyzers.contains_key(name) {
            return Err(Error::conflict(format!("analyzer '{name}' already registered")));
        }
        analyzers.insert(name.to_string(), Arc::new(analyzer));
        Ok(())
    }

    pub fn register_config(&self, config: AnalyzerConfig) -> Result<()> {
        let name = config.name.clone();
        let analyzer = config.build()?;
        self.register(&name, analyzer)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Analyzer>> {
        self.analyzers.read().unwrap().get(name).cloned()
    }

    pub fn analyze(&self, analyzer_name: &str, text: &str) -> Result<Vec<Token>> {
        self.get(analyzer_name)
            .map(|analyzer| analyzer.analyze(text))
            .ok_or_else(|| Error::not_found(format!("analyzer '{analyzer_name}' not found")))
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn registry_rejects_duplicate_registration() {
        let registry = AnalyzerRegistry::new();
        let result = registry.register("standard", Analyzer::simple());
        assert!(matches!(result, Err(e) if e.kind == ErrorKind::Conflict));
    }

    #[test]
    fn standard_analyzer_drops_stopwords_and_lowercases() {
        let registry = AnalyzerRegistry::new();
        let tokens = registry.analyze("standard", "This is a test with words").unwrap();
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["test", "words"]);
    }

    #[test]
    fn empty_input_yields_empty_term_list() {
        let registry = AnalyzerRegistry::new();
        let tokens = registry.analyze("standard", "").unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn custom_analyzer_config_rejects_empty_name() {
        let config = AnalyzerConfig {
            name: String::new(),
            tokenizer: TokenizerConfig {
                kind: "standard".into(),
            },
            filters: vec![],
        };
        assert!(config.build().is_err());
    }
}
