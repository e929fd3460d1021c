use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Per-field running totals used to compute average field length.
#[derive(Debug, Default, Clone)]
pub struct FieldStats {
    pub total_length: u64,
    pub doc_count: u64,
}

/// Index-wide statistics: total document count, per-field length totals, and
/// per-term document frequency. Feeds the BM25 helpers below.
pub struct IndexStatistics {
    total_documents: AtomicU64,
    field_stats: RwLock<HashMap<String, FieldStats>>,
    term_doc_freq: RwLock<HashMap<String, u64>>,
}

impl IndexStatistics {
    pub fn new() -> Self {
        IndexStatistics {
            total_documents: AtomicU64::new(0),
            field_stats: RwLock::new(HashMap::new()),
            term_doc_freq: RwLock::new(HashMap::new()),
        }
    }

    /// Folds in one document's field lengths; called once per indexed document.
    pub fn update_document_stats(&self, field_lengths: &HashMap<String, u32>) {
        self.total_documents.fetch_add(1, Ordering::SeqCst);
        let mut stats = self.field_stats.write();
        for (field, length) in field_lengths {
            let entry = stats.entry(field.clone()).or_default();
            entry.total_length += *length as u64;
            entry.doc_count += 1;
        }
    }

    /// Records that `field:term` gained a new document. Call once per distinct
    /// (term, doc) pair, not once per occurrence.
    pub fn update_term_stats(&self, field_term: &str) {
        *self.term_doc_freq.write().entry(field_term.to_string()).or_insert(0) += 1;
    }

    pub fn total_documents(&self) -> u64 {
        self.total_documents.load(Ordering::SeqCst)
    }

    pub fn get_document_frequency(&self, field_term: &str) -> u64 {
        self.term_doc_freq.read().get(field_term).copied().unwrap_or(0)
    }

    pub fn get_average_field_length(&self, field: &str) -> f64 {
        let stats = self.field_stats.read();
        match stats.get(field) {
            Some(s) if s.doc_count > 0 => s.total_length as f64 / s.doc_count as f64,
            _ => 0.0,
        }
    }
}

impl Default for IndexStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Okapi BM25 term-score component for one `(term, field, document)` triple.
/// `field_boost` is the mapping's declared boost for the field (default 1.0).
pub fn bm25_term_score(
    tf: f64,
    doc_freq: u64,
    total_docs: u64,
    field_length: f64,
    avg_field_length: f64,
    k1: f64,
    b: f64,
    field_boost: f64,
) -> f64 {
    if total_docs == 0 || doc_freq == 0 || tf <= 0.0 {
        return 0.0;
    }

    let idf = (((total_docs as f64 - doc_freq as f64 + 0.5) / (doc_freq as f64 + 0.5)) + 1.0).ln();
    let norm = if avg_field_length > 0.0 {
        1.0 - b + b * (field_length / avg_field_length)
    } else {
        1.0
    };
    let tf_component = (tf * (k1 + 1.0)) / (tf + k1 * norm);

    idf * tf_component * field_boost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_field_length_across_documents() {
        let stats = IndexStatistics::new();
        stats.update_document_stats(&HashMap::from([("title".to_string(), 4u32)]));
        stats.update_document_stats(&HashMap::from([("title".to_string(), 6u32)]));
        assert_eq!(stats.get_average_field_length("title"), 5.0);
        assert_eq!(stats.total_documents(), 2);
    }

    #[test]
    fn bm25_score_is_zero_for_absent_term() {
        assert_eq!(bm25_term_score(1.0, 0, 10, 5.0, 5.0, 1.2, 0.75, 1.0), 0.0);
    }

    #[test]
    fn bm25_score_increases_with_term_frequency() {
        let low = bm25_term_score(1.0, 3, 10, 5.0, 5.0, 1.2, 0.75, 1.0);
        let high = bm25_term_score(5.0, 3, 10, 5.0, 5.0, 1.2, 0.75, 1.0);
        assert!(high > low);
    }
}
