pub mod posting;
pub mod stats;
pub mod term_dictionary;
pub mod term_key;

pub use posting::{PostingEntry, PostingList};
pub use stats::IndexStatistics;
pub use term_dictionary::TermDictionary;
