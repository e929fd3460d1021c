use crate::analysis::token::Token;

/// A token filter transforms or drops tokens after tokenization. Filters
/// run in the order they're attached to an `Analyzer` and never see the
/// original text, only the tokenizer's output.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &str;
}
