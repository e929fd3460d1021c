pub mod processed;
pub mod processor;

pub use processed::{ProcessedDocument, ProcessedField};
pub use processor::DocumentProcessor;
