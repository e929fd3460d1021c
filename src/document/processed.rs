use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::DocId;

/// Per-field output of the document processor.
///
/// Invariant: `Σ term_frequencies.values() == terms.len() == length`, and
/// `positions[t].len() == term_frequencies[t]` for every term `t`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedField {
    pub original: String,
    pub terms: Vec<String>,
    pub term_frequencies: HashMap<String, u32>,
    pub length: u32,
    pub positions: HashMap<String, Vec<u32>>,
}

/// A document after running through the analyzer pipeline for each mapped field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub id: DocId,
    pub source: Value,
    pub fields: HashMap<String, ProcessedField>,
    pub field_lengths: HashMap<String, u32>,
}

impl ProcessedDocument {
    pub fn term_frequency(&self, field: &str, term: &str) -> u32 {
        self.fields
            .get(field)
            .and_then(|f| f.term_frequencies.get(term))
            .copied()
            .unwrap_or(0)
    }

    pub fn field_length(&self, field: &str) -> u32 {
        self.field_lengths.get(field).copied().unwrap_or(0)
    }
}
