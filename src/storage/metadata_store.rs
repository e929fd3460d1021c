use std::sync::Arc;

use crate::analysis::AnalyzerRegistry;
use crate::core::error::{Error, Result};
use crate::core::types::{IndexMapping, IndexMetadata, IndexSettings};
use crate::storage::kv_tier::KvTier;

/// A patch applied to an index's settings and/or mapping via `update_index`.
#[derive(Debug, Clone, Default)]
pub struct IndexPatch {
    pub settings: Option<IndexSettings>,
    pub mapping: Option<IndexMapping>,
}

fn metadata_key(index_name: &str) -> String {
    format!("idx:{index_name}:metadata")
}

/// Owns the full lifecycle of `IndexMetadata`, backed by the embedded KV
/// tier as the metadata row's durable home.
#[derive(Clone)]
pub struct IndexMetadataStore {
    kv: Arc<KvTier>,
    analyzers: Arc<AnalyzerRegistry>,
}

impl IndexMetadataStore {
    pub fn new(kv: Arc<KvTier>, analyzers: Arc<AnalyzerRegistry>) -> Self {
        IndexMetadataStore { kv, analyzers }
    }

    pub fn create_index(&self, name: &str) -> Result<IndexMetadata> {
        if self.get_index(name)?.is_some() {
            return Err(Error::conflict(format!("index '{name}' already exists")));
        }
        let metadata = IndexMetadata::new(name);
        self.put(&metadata)?;
        Ok(metadata)
    }

    pub fn get_index(&self, name: &str) -> Result<Option<IndexMetadata>> {
        match self.kv.get(&metadata_key(name))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list_indices(&self) -> Result<Vec<IndexMetadata>> {
        let rows = self.kv.get_by_prefix("idx:")?;
        rows.into_iter()
            .filter(|(key, _)| key.ends_with(":metadata"))
            .map(|(_, bytes)| Ok(serde_json::from_slice(&bytes)?))
            .collect()
    }

    /// Merges `patch` into the stored settings/mapping. A mapping update
    /// validates every referenced analyzer exists before accepting any change.
    pub fn update_index(&self, name: &str, patch: IndexPatch) -> Result<IndexMetadata> {
        let mut metadata = self
            .get_index(name)?
            .ok_or_else(|| Error::not_found(format!("index '{name}' not found")))?;

        if let Some(mapping) = &patch.mapping {
            for (field, property) in &mapping.properties {
                if let Some(analyzer) = &property.analyzer {
                    if self.analyzers.get(analyzer).is_none() {
                        return Err(Error::invalid_config(format!(
                            "field '{field}' references unknown analyzer '{analyzer}'"
                        )));
                    }
                }
            }
        }

        if let Some(settings) = patch.settings {
            metadata.settings = settings;
        }
        if let Some(mapping) = patch.mapping {
            metadata.mapping = mapping;
        }

        self.put(&metadata)?;
        Ok(metadata)
    }

    pub fn increment_document_count(&self, name: &str, delta: i64) -> Result<()> {
        let mut metadata = self
            .get_index(name)?
            .ok_or_else(|| Error::not_found(format!("index '{name}' not found")))?;
        metadata.document_count = (metadata.document_count as i64 + delta).max(0) as u64;
        self.put(&metadata)
    }

    /// Removes the metadata row. Purging postings across the hot/KV/remote
    /// tiers is the caller's responsibility (the indexing service coordinates
    /// it, since this store has no reach into the other tiers).
    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.kv.delete(&metadata_key(name))
    }

    /// Resets `documentCount` to zero but keeps the metadata row, mirroring
    /// `delete_index`'s division of responsibility for purging postings.
    pub fn clear_index(&self, name: &str) -> Result<()> {
        let mut metadata = self
            .get_index(name)?
            .ok_or_else(|| Error::not_found(format!("index '{name}' not found")))?;
        metadata.document_count = 0;
        self.put(&metadata)
    }

    fn put(&self, metadata: &IndexMetadata) -> Result<()> {
        let bytes = serde_json::to_vec(metadata)?;
        self.kv.put(&metadata_key(&metadata.name), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(kv: Arc<KvTier>) -> IndexMetadataStore {
        IndexMetadataStore::new(kv, Arc::new(AnalyzerRegistry::new()))
    }

    #[test]
    fn create_index_rejects_duplicate_names() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
        let store = store(kv);

        store.create_index("products").unwrap();
        assert!(store.create_index("products").is_err());
    }

    #[test]
    fn update_index_rejects_unknown_analyzer() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
        let store = store(kv);
        store.create_index("products").unwrap();

        let mut mapping = IndexMapping::default();
        mapping.properties.insert(
            "title".to_string(),
            crate::core::types::FieldMappingProperty::text(Some("does-not-exist"), None),
        );

        let patch = IndexPatch { settings: None, mapping: Some(mapping) };
        assert!(store.update_index("products", patch).is_err());
    }

    #[test]
    fn clear_index_resets_document_count_but_keeps_metadata() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(KvTier::open(dir.path().join("kv.log")).unwrap());
        let store = store(kv);
        store.create_index("products").unwrap();
        store.increment_document_count("products", 5).unwrap();

        store.clear_index("products").unwrap();
        let metadata = store.get_index("products").unwrap().unwrap();
        assert_eq!(metadata.document_count, 0);
    }
}
