pub mod service;

pub use service::{IndexOutcome, IndexingService};
