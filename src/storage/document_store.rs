use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::document::ProcessedDocument;
use crate::storage::kv_tier::KvTier;

/// Stores processed documents under `idx:{index}:doc:{id}` so removal and
/// reindexing can recover a document's terms without the caller resubmitting it.
#[derive(Clone)]
pub struct DocumentStore {
    kv: Arc<KvTier>,
}

fn doc_key(index_name: &str, doc_id: &DocId) -> String {
    format!("idx:{index_name}:doc:{}", doc_id.0)
}

impl DocumentStore {
    pub fn new(kv: Arc<KvTier>) -> Self {
        DocumentStore { kv }
    }

    pub fn store_document(&self, index_name: &str, document: &ProcessedDocument) -> Result<()> {
        let bytes = serde_json::to_vec(document)?;
        self.kv.put(&doc_key(index_name, &document.id), &bytes)
    }

    pub fn get_document(&self, index_name: &str, doc_id: &DocId) -> Result<Option<ProcessedDocument>> {
        match self.kv.get(&doc_key(index_name, doc_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn update_document(&self, index_name: &str, document: &ProcessedDocument) -> Result<()> {
        if self.get_document(index_name, &document.id)?.is_none() {
            return Err(Error::not_found(format!(
                "document '{}' not found in index '{index_name}'",
                document.id
            )));
        }
        self.store_document(index_name, document)
    }

    pub fn delete_document(&self, index_name: &str, doc_id: &DocId) -> Result<()> {
        self.kv.delete(&doc_key(index_name, doc_id))
    }

    /// Fetches documents matching a caller-supplied predicate, offset/limited.
    /// The KV tier has no query language of its own, so filtering happens
    /// in-process over the index's document prefix.
    pub fn get_documents(
        &self,
        index_name: &str,
        filter: impl Fn(&ProcessedDocument) -> bool,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ProcessedDocument>> {
        let prefix = format!("idx:{index_name}:doc:");
        let rows = self.kv.get_by_prefix(&prefix)?;

        let mut matched = Vec::new();
        for (_, bytes) in rows {
            let document: ProcessedDocument = serde_json::from_slice(&bytes)?;
            if filter(&document) {
                matched.push(document);
            }
        }

        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    pub fn bulk_delete_documents(&self, index_name: &str, doc_ids: &[DocId]) -> Result<()> {
        for doc_id in doc_ids {
            self.delete_document(index_name, doc_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use std::collections::HashMap;

    fn sample(id: &str, tag: &str) -> ProcessedDocument {
        ProcessedDocument {
            id: DocId::new(id),
            source: json!({ "tag": tag }),
            fields: HashMap::new(),
            field_lengths: HashMap::new(),
        }
    }

    #[test]
    fn stores_and_retrieves_a_document() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
        let store = DocumentStore::new(kv);

        let document = sample("1", "even");
        store.store_document("products", &document).unwrap();

        let fetched = store.get_document("products", &DocId::new("1")).unwrap().unwrap();
        assert_eq!(fetched.source, json!({ "tag": "even" }));
    }

    #[test]
    fn update_on_missing_document_fails() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
        let store = DocumentStore::new(kv);

        let document = sample("missing", "even");
        assert!(store.update_document("products", &document).is_err());
    }

    #[test]
    fn get_documents_applies_filter_offset_and_limit() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
        let store = DocumentStore::new(kv);

        for i in 0..5 {
            let tag = if i % 2 == 0 { "even" } else { "odd" };
            store.store_document("products", &sample(&i.to_string(), tag)).unwrap();
        }

        let evens = store
            .get_documents("products", |d| d.source["tag"] == "even", 0, 10)
            .unwrap();
        assert_eq!(evens.len(), 3);
    }
}
