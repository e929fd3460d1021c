use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::core::error::{Error, Result};
use crate::core::types::{Document, IndexMetadata};
use crate::document::{DocumentProcessor, ProcessedDocument};
use crate::index::posting::PostingEntry;
use crate::index::stats::IndexStatistics;
use crate::index::term_dictionary::TermDictionary;
use crate::index::term_key::{all_term_key, field_term, term_key};
use crate::schema::RuntimeMapping;
use crate::storage::document_store::DocumentStore;
use crate::storage::kv_tier::KvTier;
use crate::storage::metadata_store::IndexMetadataStore;
use crate::storage::remote_tier::RemoteTier;

/// Outcome of indexing one document: the processed document (for a caller
/// that wants it) and the canonical term keys that were written, so a bulk
/// caller can push them onto the durable dirty-term list without recomputing
/// the set itself.
pub struct IndexOutcome {
    pub processed: ProcessedDocument,
    pub dirty_term_keys: Vec<String>,
}

/// Orchestrates `processing -> hot-tier write -> KV write -> dirty-term
/// emission` for a single document. The remote tier is never touched here;
/// that is the persistence worker's job, driven by the dirty-term list this
/// service emits.
pub struct IndexingService {
    processor: DocumentProcessor,
    term_dictionary: Arc<TermDictionary>,
    kv: Arc<KvTier>,
    metadata_store: IndexMetadataStore,
    document_store: DocumentStore,
    stats: RwLock<HashMap<String, Arc<IndexStatistics>>>,
}

impl IndexingService {
    pub fn new(
        processor: DocumentProcessor,
        term_dictionary: Arc<TermDictionary>,
        kv: Arc<KvTier>,
        metadata_store: IndexMetadataStore,
        document_store: DocumentStore,
    ) -> Self {
        IndexingService {
            processor,
            term_dictionary,
            kv,
            metadata_store,
            document_store,
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn stats_for(&self, index_name: &str) -> Arc<IndexStatistics> {
        if let Some(stats) = self.stats.read().get(index_name) {
            return stats.clone();
        }
        let mut guard = self.stats.write();
        guard
            .entry(index_name.to_string())
            .or_insert_with(|| Arc::new(IndexStatistics::new()))
            .clone()
    }

    fn runtime_mapping(&self, metadata: &IndexMetadata) -> RuntimeMapping {
        if metadata.mapping.properties.is_empty() {
            RuntimeMapping::default()
        } else {
            RuntimeMapping::from_index_mapping(&metadata.mapping)
        }
    }

    /// `indexDocument(indexName, id, document, fromBulk?)`. Returns the
    /// processed document and the set of term keys it touched.
    #[instrument(skip(self, document), fields(index = %index_name, doc_id = %document.id))]
    pub fn index_document(
        &self,
        index_name: &str,
        document: &Document,
        from_bulk: bool,
    ) -> Result<IndexOutcome> {
        let metadata = self
            .metadata_store
            .get_index(index_name)?
            .ok_or_else(|| Error::not_found(format!("index '{index_name}' not found")))?;

        let mapping = self.runtime_mapping(&metadata);
        let processed = self.processor.process(document, &mapping)?;

        self.document_store.store_document(index_name, &processed)?;

        let mut dirty_term_keys = Vec::new();
        for (field, processed_field) in &processed.fields {
            for term in processed_field.term_frequencies.keys() {
                let field_key = term_key(index_name, &field_term(field, term));
                self.term_dictionary
                    .add_posting(&field_key, PostingEntry::new(document.id.clone()));
                self.write_through_kv(&field_key)?;

                let all_key = all_term_key(index_name, term);
                self.term_dictionary.add_posting(
                    &all_key,
                    PostingEntry::new(document.id.clone()).with_metadata("field", field.clone()),
                );
                self.write_through_kv(&all_key)?;

                dirty_term_keys.push(field_key);
                dirty_term_keys.push(all_key);
            }
        }
        dirty_term_keys.sort();
        dirty_term_keys.dedup();

        let stats = self.stats_for(index_name);
        stats.update_document_stats(&processed.field_lengths);
        for (field, processed_field) in &processed.fields {
            for term in processed_field.term_frequencies.keys() {
                stats.update_term_stats(&field_term(field, term));
            }
        }

        if !from_bulk {
            self.metadata_store.increment_document_count(index_name, 1)?;
        }

        debug!(terms = dirty_term_keys.len(), "document indexed");
        Ok(IndexOutcome { processed, dirty_term_keys })
    }

    fn write_through_kv(&self, key: &str) -> Result<()> {
        let list = self.term_dictionary.get(key).unwrap_or_default();
        self.kv.put(&format!("term:{key}"), &list.to_bytes()?)
    }

    /// The hot tier's current posting list for a canonical term key, for a
    /// bulk worker staging a snapshot to persist.
    pub fn snapshot_postings(&self, key: &str) -> crate::index::posting::PostingList {
        self.term_dictionary.get(key).unwrap_or_default()
    }

    /// Applies a document-count delta deferred by `index_document(.., from_bulk
    /// = true)`. Per spec §4.6 step 6, a bulk-indexed document's count is not
    /// incremented inline; the bulk commit path calls this once per batch
    /// instead, after the batch's documents have all been indexed.
    pub fn apply_deferred_document_count(&self, index_name: &str, delta: i64) -> Result<()> {
        self.metadata_store.increment_document_count(index_name, delta)
    }

    /// Symmetric removal: fetch the processed document, remove it from each
    /// term's posting list, drop terms that become empty, decrement stats
    /// and document count.
    #[instrument(skip(self))]
    pub fn remove_document(&self, index_name: &str, doc_id: &crate::core::types::DocId) -> Result<()> {
        let processed = self
            .document_store
            .get_document(index_name, doc_id)?
            .ok_or_else(|| Error::not_found(format!("document '{doc_id}' not found in index '{index_name}'")))?;

        for (field, processed_field) in &processed.fields {
            for term in processed_field.term_frequencies.keys() {
                self.remove_posting(index_name, field, term, doc_id)?;
            }
        }

        self.document_store.delete_document(index_name, doc_id)?;
        self.metadata_store.increment_document_count(index_name, -1)?;
        Ok(())
    }

    fn remove_posting(&self, index_name: &str, field: &str, term: &str, doc_id: &crate::core::types::DocId) -> Result<()> {
        let field_key = term_key(index_name, &field_term(field, term));
        self.term_dictionary.remove_posting(&field_key, doc_id);
        self.finalize_posting(&field_key)?;

        let all_key = all_term_key(index_name, term);
        self.term_dictionary.remove_posting(&all_key, doc_id);
        self.finalize_posting(&all_key)?;
        Ok(())
    }

    /// `deleteByQuery(index, {term: {field, value}})`: removes every document
    /// whose stored `field` equals `value`, the same way a caller-driven
    /// sequence of `removeDocument` calls would, but resolved in one pass
    /// over the document store instead of round-tripping doc ids first.
    #[instrument(skip(self, value), fields(index = %index_name, field = %field))]
    pub fn delete_by_query(&self, index_name: &str, field: &str, value: &serde_json::Value) -> Result<usize> {
        let field = field.to_string();
        let value = value.clone();
        let matches = self
            .document_store
            .get_documents(index_name, move |doc| doc.source.get(&field) == Some(&value), 0, usize::MAX)?;

        let count = matches.len();
        for document in &matches {
            self.remove_document(index_name, &document.id)?;
        }
        Ok(count)
    }

    fn finalize_posting(&self, key: &str) -> Result<()> {
        match self.term_dictionary.get(key) {
            Some(list) if list.is_empty() => {
                self.term_dictionary.remove_term(key);
                self.kv.delete(&format!("term:{key}"))?;
            }
            Some(list) => {
                self.kv.put(&format!("term:{key}"), &list.to_bytes()?)?;
            }
            None => {}
        }
        Ok(())
    }

    /// Deletes an index and purges every term posting it owns across all
    /// three tiers, per spec §3 ("deleted by explicit delete, which must also
    /// purge all term postings for that index"). The metadata row is removed
    /// last, so a crash mid-purge still leaves the index visible as existing
    /// rather than silently vanished with orphaned postings behind it.
    #[instrument(skip(self, remote), fields(index = %index_name))]
    pub async fn delete_index(&self, index_name: &str, remote: &RemoteTier) -> Result<()> {
        self.purge_postings(index_name)?;
        remote.delete_index(index_name).await?;
        self.metadata_store.delete_index(index_name)?;
        Ok(())
    }

    /// Resets an index to empty — same postings purge as `delete_index`, but
    /// keeps the metadata row (and the index itself) in place.
    #[instrument(skip(self, remote), fields(index = %index_name))]
    pub async fn clear_index(&self, index_name: &str, remote: &RemoteTier) -> Result<()> {
        self.purge_postings(index_name)?;
        remote.delete_index(index_name).await?;
        self.metadata_store.clear_index(index_name)?;
        Ok(())
    }

    /// Drops every hot-tier entry and KV-tier term row scoped to `index_name`.
    /// The remote tier's chunks are purged separately by the caller
    /// (`delete_index`/`clear_index`) since that purge is a collaborator call,
    /// not a local write.
    fn purge_postings(&self, index_name: &str) -> Result<()> {
        let prefix = format!("{index_name}:");
        for key in self.term_dictionary.get_terms() {
            if key.starts_with(&prefix) {
                self.term_dictionary.remove_term(&key);
            }
        }
        for (key, _) in self.kv.get_by_prefix(&format!("term:{prefix}"))? {
            self.kv.delete(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzerRegistry;
    use crate::core::types::{DocId, FieldMappingProperty, IndexMapping};
    use serde_json::json;
    use tempfile::tempdir;

    fn harness(dir: &std::path::Path) -> (Arc<KvTier>, Arc<AnalyzerRegistry>) {
        let kv = Arc::new(KvTier::open(dir.join("kv.log")).unwrap());
        (kv, Arc::new(AnalyzerRegistry::new()))
    }

    #[test]
    fn indexing_a_document_populates_field_and_all_term_keys() {
        let dir = tempdir().unwrap();
        let (kv, analyzers) = harness(dir.path());
        let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
        let mut mapping = IndexMapping::default();
        mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), None));
        metadata_store.create_index("products").unwrap();
        metadata_store
            .update_index("products", crate::storage::metadata_store::IndexPatch { settings: None, mapping: Some(mapping) })
            .unwrap();

        let service = IndexingService::new(
            DocumentProcessor::new(analyzers),
            Arc::new(TermDictionary::new(100)),
            kv.clone(),
            metadata_store.clone(),
            DocumentStore::new(kv),
        );

        let document = Document::new(DocId::new("1"), json!({ "title": "quick brown fox" }));
        let outcome = service.index_document("products", &document, false).unwrap();

        assert!(outcome.dirty_term_keys.contains(&"products:title:fox".to_string()));
        assert!(outcome.dirty_term_keys.contains(&"products:_all:fox".to_string()));

        let metadata = service.metadata_store.get_index("products").unwrap().unwrap();
        assert_eq!(metadata.document_count, 1);
    }

    #[test]
    fn removing_a_document_drops_its_postings_and_decrements_count() {
        let dir = tempdir().unwrap();
        let (kv, analyzers) = harness(dir.path());
        let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
        let mut mapping = IndexMapping::default();
        mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), None));
        metadata_store.create_index("products").unwrap();
        metadata_store
            .update_index("products", crate::storage::metadata_store::IndexPatch { settings: None, mapping: Some(mapping) })
            .unwrap();

        let term_dictionary = Arc::new(TermDictionary::new(100));
        let service = IndexingService::new(
            DocumentProcessor::new(analyzers),
            term_dictionary.clone(),
            kv.clone(),
            metadata_store.clone(),
            DocumentStore::new(kv),
        );

        let document = Document::new(DocId::new("1"), json!({ "title": "quick brown fox" }));
        service.index_document("products", &document, false).unwrap();
        service.remove_document("products", &DocId::new("1")).unwrap();

        assert!(!term_dictionary.has("products:title:fox"));
        let metadata = service.metadata_store.get_index("products").unwrap().unwrap();
        assert_eq!(metadata.document_count, 0);
    }

    #[test]
    fn delete_by_query_removes_only_matching_documents() {
        let dir = tempdir().unwrap();
        let (kv, analyzers) = harness(dir.path());
        let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
        let mut mapping = IndexMapping::default();
        mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), None));
        mapping.properties.insert("tag".into(), FieldMappingProperty::keyword());
        metadata_store.create_index("products").unwrap();
        metadata_store
            .update_index("products", crate::storage::metadata_store::IndexPatch { settings: None, mapping: Some(mapping) })
            .unwrap();

        let term_dictionary = Arc::new(TermDictionary::new(100));
        let service = IndexingService::new(
            DocumentProcessor::new(analyzers),
            term_dictionary.clone(),
            kv.clone(),
            metadata_store.clone(),
            DocumentStore::new(kv),
        );

        service
            .index_document("products", &Document::new(DocId::new("1"), json!({ "title": "alpha", "tag": "gamma" })), false)
            .unwrap();
        service
            .index_document("products", &Document::new(DocId::new("2"), json!({ "title": "beta", "tag": "delta" })), false)
            .unwrap();
        service
            .index_document("products", &Document::new(DocId::new("3"), json!({ "title": "charlie", "tag": "gamma" })), false)
            .unwrap();

        let removed = service.delete_by_query("products", "tag", &json!("gamma")).unwrap();
        assert_eq!(removed, 2);

        assert!(!term_dictionary.has("products:title:alpha"));
        assert!(term_dictionary.has("products:title:beta"));
        let metadata = service.metadata_store.get_index("products").unwrap().unwrap();
        assert_eq!(metadata.document_count, 1);
    }

    #[test]
    fn apply_deferred_document_count_applies_the_bulk_batch_delta() {
        let dir = tempdir().unwrap();
        let (kv, analyzers) = harness(dir.path());
        let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
        let mut mapping = IndexMapping::default();
        mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), None));
        metadata_store.create_index("products").unwrap();
        metadata_store
            .update_index("products", crate::storage::metadata_store::IndexPatch { settings: None, mapping: Some(mapping) })
            .unwrap();

        let service = IndexingService::new(
            DocumentProcessor::new(analyzers),
            Arc::new(TermDictionary::new(100)),
            kv.clone(),
            metadata_store.clone(),
            DocumentStore::new(kv),
        );

        for i in 0..3 {
            service
                .index_document("products", &Document::new(DocId::new(i.to_string()), json!({ "title": "fox" })), true)
                .unwrap();
        }
        let metadata = service.metadata_store.get_index("products").unwrap().unwrap();
        assert_eq!(metadata.document_count, 0, "fromBulk=true defers the count");

        service.apply_deferred_document_count("products", 3).unwrap();
        let metadata = service.metadata_store.get_index("products").unwrap().unwrap();
        assert_eq!(metadata.document_count, 3);
    }

    #[test]
    fn purge_postings_drops_only_the_named_index_hot_and_kv_state() {
        let dir = tempdir().unwrap();
        let (kv, analyzers) = harness(dir.path());
        let metadata_store = IndexMetadataStore::new(kv.clone(), analyzers.clone());
        let mut mapping = IndexMapping::default();
        mapping.properties.insert("title".into(), FieldMappingProperty::text(Some("standard"), None));
        metadata_store.create_index("products").unwrap();
        metadata_store.create_index("articles").unwrap();
        metadata_store
            .update_index("products", crate::storage::metadata_store::IndexPatch { settings: None, mapping: Some(mapping.clone()) })
            .unwrap();
        metadata_store
            .update_index("articles", crate::storage::metadata_store::IndexPatch { settings: None, mapping: Some(mapping) })
            .unwrap();

        let term_dictionary = Arc::new(TermDictionary::new(100));
        let service = IndexingService::new(
            DocumentProcessor::new(analyzers),
            term_dictionary.clone(),
            kv.clone(),
            metadata_store.clone(),
            DocumentStore::new(kv.clone()),
        );

        service
            .index_document("products", &Document::new(DocId::new("1"), json!({ "title": "fox" })), false)
            .unwrap();
        service
            .index_document("articles", &Document::new(DocId::new("1"), json!({ "title": "fox" })), false)
            .unwrap();

        service.purge_postings("products").unwrap();

        assert!(!term_dictionary.has("products:title:fox"));
        assert!(term_dictionary.has("articles:title:fox"));
        assert!(kv.get("term:products:title:fox").unwrap().is_none());
        assert!(kv.get("term:articles:title:fox").unwrap().is_some());
    }
}
