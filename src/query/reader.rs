use std::sync::Arc;

use crate::core::error::Result;
use crate::index::posting::PostingList;
use crate::index::stats::{bm25_term_score, IndexStatistics};
use crate::index::term_dictionary::TermDictionary;
use crate::index::term_key::term_key;
use crate::storage::kv_tier::KvTier;
use crate::storage::remote_tier::RemoteTier;

/// Read-only tiered lookup over a term's posting list: hot tier first, then
/// the embedded KV tier, then the remote authoritative tier, populating
/// faster tiers on a miss. Never mutates the dirty-term list; that is the
/// indexing side's responsibility.
pub struct IndexReader {
    index_name: String,
    term_dictionary: Arc<TermDictionary>,
    kv: Arc<KvTier>,
    remote: Arc<RemoteTier>,
    stats: Arc<IndexStatistics>,
}

impl IndexReader {
    pub fn new(
        index_name: impl Into<String>,
        term_dictionary: Arc<TermDictionary>,
        kv: Arc<KvTier>,
        remote: Arc<RemoteTier>,
        stats: Arc<IndexStatistics>,
    ) -> Self {
        IndexReader {
            index_name: index_name.into(),
            term_dictionary,
            kv,
            remote,
            stats,
        }
    }

    /// Looks up a `field:term` posting list, checking the hot tier, then the
    /// KV tier (populating the hot tier on a hit), then the remote tier
    /// (populating both faster tiers on a hit).
    pub async fn read_postings(&self, field_term: &str) -> Result<PostingList> {
        let key = term_key(&self.index_name, field_term);

        if let Some(list) = self.term_dictionary.get(&key) {
            return Ok(list);
        }

        if let Some(bytes) = self.kv.get(&format!("term:{key}"))? {
            let list = PostingList::from_bytes(&bytes)?;
            self.term_dictionary.put(&key, list.clone());
            return Ok(list);
        }

        let list = self.remote.read_term(&self.index_name, field_term).await?;
        if !list.is_empty() {
            self.term_dictionary.put(&key, list.clone());
            self.kv.put(&format!("term:{key}"), &list.to_bytes()?)?;
        }
        Ok(list)
    }

    pub fn total_documents(&self) -> u64 {
        self.stats.total_documents()
    }

    pub fn get_document_frequency(&self, field_term: &str) -> u64 {
        self.stats.get_document_frequency(field_term)
    }

    pub fn get_average_field_length(&self, field: &str) -> f64 {
        self.stats.get_average_field_length(field)
    }

    /// Scores one term's contribution to a document's relevance, given the
    /// document's term frequency and field length, using this reader's index
    /// statistics for idf and average field length.
    pub fn score_term(
        &self,
        field: &str,
        field_term: &str,
        tf: u32,
        field_length: u32,
        k1: f64,
        b: f64,
        field_boost: f64,
    ) -> f64 {
        bm25_term_score(
            tf as f64,
            self.get_document_frequency(field_term),
            self.total_documents(),
            field_length as f64,
            self.get_average_field_length(field),
            k1,
            b,
            field_boost,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::posting::PostingEntry;
    use crate::core::types::DocId;
    use tempfile::tempdir;

    fn harness(dir: &std::path::Path) -> (Arc<KvTier>, Arc<TermDictionary>, Arc<IndexStatistics>) {
        let kv = Arc::new(KvTier::open(dir.join("kv.log")).unwrap());
        let term_dictionary = Arc::new(TermDictionary::new(100));
        let stats = Arc::new(IndexStatistics::new());
        (kv, term_dictionary, stats)
    }

    #[test]
    fn hot_tier_hit_serves_without_touching_kv() {
        let dir = tempdir().unwrap();
        let (kv, term_dictionary, _stats) = harness(dir.path());
        term_dictionary.add_posting("articles:title:fox", PostingEntry::new(DocId::new("1")));

        let list = term_dictionary.get("articles:title:fox").unwrap();
        assert_eq!(list.size(), 1);
        let _ = kv;
    }

    #[test]
    fn score_term_is_zero_when_statistics_are_empty() {
        let dir = tempdir().unwrap();
        let (_kv, _term_dictionary, stats) = harness(dir.path());
        assert_eq!(stats.get_document_frequency("title:fox"), 0);
        assert_eq!(
            bm25_term_score(1.0, stats.get_document_frequency("title:fox"), stats.total_documents(), 5.0, 5.0, 1.2, 0.75, 1.0),
            0.0
        );
    }
}
