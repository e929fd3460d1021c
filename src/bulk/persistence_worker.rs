use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::bulk::payload_staging::{PayloadStaging, PersistBatchTermsJob};
use crate::bulk::tracker::BulkOperationTracker;
use crate::core::error::Result;
use crate::storage::remote_tier::RemoteTier;

const DIRTY_DRAIN_BATCH: usize = 100;

/// One `drain-dirty-list` job: pop up to [`DIRTY_DRAIN_BATCH`] terms at a
/// time and forget about them. The list is a signal that the remote tier is
/// behind, not a work queue to persist from directly; actual persistence
/// happens through `persist-batch-terms` jobs staged alongside each batch.
#[derive(Debug, Clone)]
pub struct DrainDirtyListJob {
    pub bulk_op_id: String,
    pub index_name: String,
}

/// Runs the two job kinds the single persistence-queue worker handles.
/// Concurrency for this worker is always 1: persistence must serialize so a
/// batch's terms land in the remote tier in the order they were produced.
pub struct PersistenceWorker {
    staging: PayloadStaging,
    tracker: Arc<BulkOperationTracker>,
    remote: Arc<RemoteTier>,
}

impl PersistenceWorker {
    pub fn new(staging: PayloadStaging, tracker: Arc<BulkOperationTracker>, remote: Arc<RemoteTier>) -> Self {
        PersistenceWorker { staging, tracker, remote }
    }

    /// Drains the dirty-term list for one bulk operation until it is empty
    /// and every batch has been indexed. Never itself persists a term; that
    /// is `persist_batch_terms`'s job, driven by `PersistBatchTermsJob`s
    /// enqueued per batch.
    #[instrument(skip(self))]
    pub async fn drain_dirty_list(&self, job: &DrainDirtyListJob) -> Result<()> {
        loop {
            let drained = self.tracker.pop_dirty_terms_batch(&job.bulk_op_id, DIRTY_DRAIN_BATCH).await?;
            let remaining = self.tracker.get_dirty_list_length(&job.bulk_op_id).await?;

            let record = self.tracker.get_or_load_operation(&job.bulk_op_id).await?;
            let fully_indexed = record
                .map(|r| r.indexed_batches >= r.total_batches)
                .unwrap_or(false);

            if drained.is_empty() && remaining == 0 && fully_indexed {
                self.tracker.delete_dirty_list(&job.bulk_op_id).await?;
                info!(bulk_op = %job.bulk_op_id, "dirty list drained");
                return Ok(());
            }
            if drained.is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }

    /// Persists one batch's staged term postings into the remote tier. Merges
    /// are idempotent, so any term failure can simply be retried: already
    /// merged terms re-merge harmlessly.
    #[instrument(skip(self, job))]
    pub async fn persist_batch_terms(&self, job: &PersistBatchTermsJob) -> Result<()> {
        let payload = match self.staging.resolve(job, &self.tracker).await? {
            Some(payload) => payload,
            None => {
                // Duplicate job for an already fully-persisted operation: nothing to do.
                return Ok(());
            }
        };

        for (field_term, entries) in payload.term_postings {
            if let Err(err) = self.remote.merge_entries(&payload.index_name, &field_term, &entries).await {
                error!(term = %field_term, error = %err, "failed to merge term into remote tier");
                return Err(err);
            }
        }

        self.tracker.mark_batch_persisted(&payload.bulk_op_id).await?;
        self.staging.complete(job).await?;
        Ok(())
    }
}
