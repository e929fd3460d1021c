use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bulk::tracker::BulkOperationTracker;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::posting::PostingEntry;
use crate::storage::cache::RedisCache;

/// The body staged for a `persist-batch-terms` job: per-term posting entries
/// produced by one indexing batch. Kept out of the queue message itself
/// because a batch's payload can be tens of MB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTermsPayload {
    pub index_name: String,
    pub batch_id: String,
    pub bulk_op_id: String,
    pub term_postings: std::collections::HashMap<String, Vec<PostingEntry>>,
}

/// The job message that actually crosses the queue: just enough to find the
/// staged payload again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistBatchTermsJob {
    pub index_name: String,
    pub batch_id: String,
    pub bulk_op_id: String,
    pub payload_key: String,
}

/// Stages a payload before enqueueing its job: writes it to the cache (fast
/// path) and mirrors a durable reference into the pending-jobs table, so a
/// crash between staging and processing can still be recovered from.
pub struct PayloadStaging {
    cache: Arc<RedisCache>,
}

impl PayloadStaging {
    pub fn new(cache: Arc<RedisCache>) -> Self {
        PayloadStaging { cache }
    }

    pub async fn stage(&self, payload: BatchTermsPayload) -> Result<PersistBatchTermsJob> {
        let payload_key = format!("{}:{}:{}", payload.index_name, payload.bulk_op_id, payload.batch_id);
        self.cache.stage_payload(&payload_key, &payload).await?;
        self.cache.mirror_pending_job(&payload_key, &payload).await?;

        Ok(PersistBatchTermsJob {
            index_name: payload.index_name,
            batch_id: payload.batch_id,
            bulk_op_id: payload.bulk_op_id,
            payload_key,
        })
    }

    /// Resolves a job's payload: cache fast path, then the pending-jobs
    /// durable fallback, then — if both miss — checks whether the bulk
    /// operation is already fully persisted (duplicate job, zero work) before
    /// giving up with `DataLossPrevention`.
    pub async fn resolve(
        &self,
        job: &PersistBatchTermsJob,
        tracker: &BulkOperationTracker,
    ) -> Result<Option<BatchTermsPayload>> {
        if let Some(payload) = self.cache.read_payload(&job.payload_key).await? {
            return Ok(Some(payload));
        }
        if let Some(payload) = self.cache.read_pending_job(&job.payload_key).await? {
            return Ok(Some(payload));
        }

        let record = tracker.get_or_load_operation(&job.bulk_op_id).await?;
        match record {
            Some(record) if record.persisted_batches >= record.total_batches => Ok(None),
            _ => Err(Error::new(
                ErrorKind::DataLossPrevention,
                format!(
                    "payload for batch '{}' of bulk operation '{}' is unrecoverable and the operation is not fully persisted",
                    job.batch_id, job.bulk_op_id
                ),
            )),
        }
    }

    /// Removes the pending reference before deleting the staged payload, so a
    /// crash between the two steps never leaves a pending reference pointing
    /// at a missing payload.
    pub async fn complete(&self, job: &PersistBatchTermsJob) -> Result<()> {
        self.cache.remove_pending_job(&job.payload_key).await?;
        self.cache.delete_payload(&job.payload_key).await?;
        Ok(())
    }

    /// Recovery path for a job whose message was evicted but whose pending
    /// reference survived: pops the oldest pending reference, re-hydrates the
    /// payload, and returns it for processing.
    pub async fn recover_oldest_pending(&self) -> Result<Option<(String, BatchTermsPayload)>> {
        match self.cache.pop_oldest_pending_job().await? {
            Some((payload_key, json)) => {
                let payload: BatchTermsPayload = serde_json::from_str(&json)?;
                Ok(Some((payload_key, payload)))
            }
            None => Ok(None),
        }
    }
}
