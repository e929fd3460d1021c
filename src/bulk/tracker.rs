use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::storage::cache::RedisCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkOperationStatus {
    Indexing,
    Persisting,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOperationRecord {
    pub id: String,
    pub index_name: String,
    pub total_batches: u32,
    pub batch_ids: Vec<String>,
    pub total_documents: u32,
    pub indexed_batches: u32,
    pub persisted_batches: u32,
    pub status: BulkOperationStatus,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl BulkOperationRecord {
    fn new(id: String, index_name: String, total_batches: u32, batch_ids: Vec<String>, total_documents: u32) -> Self {
        BulkOperationRecord {
            id,
            index_name,
            total_batches,
            batch_ids,
            total_documents,
            indexed_batches: 0,
            persisted_batches: 0,
            status: BulkOperationStatus::Indexing,
            created_at: Utc::now(),
            error: None,
        }
    }
}

/// In-memory `bulkOpId -> record` map, mirrored asynchronously to the remote
/// in-memory cache so the tracker survives a process restart. Counters are
/// monotone: `indexed`/`persisted` never decrease, and status transitions
/// only move forward (`indexing -> persisting -> completed|failed`).
pub struct BulkOperationTracker {
    records: RwLock<HashMap<String, BulkOperationRecord>>,
    cache: Arc<RedisCache>,
}

impl BulkOperationTracker {
    pub fn new(cache: Arc<RedisCache>) -> Self {
        BulkOperationTracker {
            records: RwLock::new(HashMap::new()),
            cache,
        }
    }

    pub async fn create_operation(
        &self,
        id: &str,
        index_name: &str,
        total_batches: u32,
        batch_ids: Vec<String>,
        total_documents: u32,
    ) -> Result<BulkOperationRecord> {
        let record = BulkOperationRecord::new(id.to_string(), index_name.to_string(), total_batches, batch_ids, total_documents);
        self.records.write().insert(id.to_string(), record.clone());
        self.cache.mirror_tracker_record(id, &record).await?;
        Ok(record)
    }

    pub fn get_operation(&self, id: &str) -> Option<BulkOperationRecord> {
        self.records.read().get(id).cloned()
    }

    /// Loads the record from memory, falling back to the cache mirror (e.g.
    /// after a process restart) and re-populating the in-memory map.
    pub async fn get_or_load_operation(&self, id: &str) -> Result<Option<BulkOperationRecord>> {
        if let Some(record) = self.get_operation(id) {
            return Ok(Some(record));
        }
        let loaded: Option<BulkOperationRecord> = self.cache.read_tracker_record(id).await?;
        if let Some(record) = &loaded {
            self.records.write().insert(id.to_string(), record.clone());
        }
        Ok(loaded)
    }

    /// Marks one more batch indexed. Returns `true` exactly the call on which
    /// `indexed_batches` first reaches `total_batches` (the caller should emit
    /// `all-batches-indexed` on that transition, once).
    pub async fn mark_batch_indexed(&self, id: &str) -> Result<bool> {
        let (record, just_completed) = {
            let mut records = self.records.write();
            let record = records
                .get_mut(id)
                .ok_or_else(|| Error::not_found(format!("bulk operation '{id}' not found")))?;
            let was_below = record.indexed_batches < record.total_batches;
            record.indexed_batches += 1;
            if record.status == BulkOperationStatus::Indexing && record.indexed_batches >= record.total_batches {
                record.status = BulkOperationStatus::Persisting;
            }
            let just_completed = was_below && record.indexed_batches == record.total_batches;
            (record.clone(), just_completed)
        };
        self.cache.mirror_tracker_record(id, &record).await?;
        Ok(just_completed)
    }

    /// Marks one more batch persisted. Transitions to `completed` once
    /// `persisted_batches == total_batches`.
    pub async fn mark_batch_persisted(&self, id: &str) -> Result<bool> {
        let (record, just_completed) = {
            let mut records = self.records.write();
            let record = records
                .get_mut(id)
                .ok_or_else(|| Error::not_found(format!("bulk operation '{id}' not found")))?;
            record.persisted_batches += 1;
            let just_completed = record.persisted_batches == record.total_batches;
            if just_completed {
                record.status = BulkOperationStatus::Completed;
            }
            (record.clone(), just_completed)
        };
        self.cache.mirror_tracker_record(id, &record).await?;
        Ok(just_completed)
    }

    pub async fn mark_operation_failed(&self, id: &str, error: &str) -> Result<()> {
        let record = {
            let mut records = self.records.write();
            let record = records
                .get_mut(id)
                .ok_or_else(|| Error::not_found(format!("bulk operation '{id}' not found")))?;
            record.status = BulkOperationStatus::Failed;
            record.error = Some(error.to_string());
            record.clone()
        };
        self.cache.mirror_tracker_record(id, &record).await?;
        Ok(())
    }

    pub async fn push_dirty_terms(&self, id: &str, terms: &[String]) -> Result<()> {
        self.cache.push_dirty_terms(id, terms).await
    }

    pub async fn pop_dirty_terms_batch(&self, id: &str, n: usize) -> Result<Vec<String>> {
        self.cache.pop_dirty_terms_batch(id, n).await
    }

    pub async fn get_dirty_list_length(&self, id: &str) -> Result<u64> {
        self.cache.dirty_list_length(id).await
    }

    pub async fn delete_dirty_list(&self, id: &str) -> Result<()> {
        self.cache.delete_dirty_list(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: u32) -> BulkOperationRecord {
        BulkOperationRecord::new("op-1".into(), "products".into(), total, vec![], 100)
    }

    #[test]
    fn counters_start_at_zero_and_status_starts_indexing() {
        let r = record(5);
        assert_eq!(r.indexed_batches, 0);
        assert_eq!(r.persisted_batches, 0);
        assert_eq!(r.status, BulkOperationStatus::Indexing);
    }
}
