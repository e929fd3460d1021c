use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::bulk::payload_staging::{BatchTermsPayload, PayloadStaging, PersistBatchTermsJob};
use crate::bulk::persistence_worker::{DrainDirtyListJob, PersistenceWorker};
use crate::bulk::queue::{JobQueue, RetryPolicy, SharedJobQueue};
use crate::bulk::tracker::BulkOperationTracker;
use crate::core::error::Result;
use crate::core::types::Document;
use crate::index::posting::PostingEntry;
use crate::indexing::IndexingService;

/// One batch of documents carved out of a `queueBulkIndexing` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBatchJob {
    pub index_name: String,
    pub bulk_op_id: String,
    pub batch_id: String,
    pub documents: Vec<Document>,
}

/// Options accepted by `queueBulkIndexing`, mirroring the external control
/// surface's `options` object.
#[derive(Debug, Clone)]
pub struct BulkIndexOptions {
    pub batch_size: usize,
    pub skip_duplicates: bool,
    pub priority: i32,
    pub enable_progress: bool,
}

impl Default for BulkIndexOptions {
    fn default() -> Self {
        BulkIndexOptions {
            batch_size: 1000,
            skip_duplicates: false,
            priority: 0,
            enable_progress: false,
        }
    }
}

/// The two in-process queues plus the shared state needed to drive them: the
/// indexing queue runs N workers in parallel, the persistence queue strictly
/// one. Job bodies are plain enums rather than boxed trait objects, since the
/// set of job kinds per queue is small and closed.
pub struct BulkPipeline {
    indexing_queue: SharedJobQueue<IndexBatchJob>,
    persistence_queue: SharedJobQueue<PersistenceJob>,
    tracker: Arc<BulkOperationTracker>,
    staging: Arc<PayloadStaging>,
}

#[derive(Debug, Clone)]
pub enum PersistenceJob {
    DrainDirtyList(DrainDirtyListJob),
    PersistBatchTerms(PersistBatchTermsJob),
}

impl BulkPipeline {
    pub fn new(tracker: Arc<BulkOperationTracker>, staging: Arc<PayloadStaging>) -> Self {
        BulkPipeline {
            indexing_queue: Arc::new(JobQueue::new("indexing", RetryPolicy::indexing())),
            persistence_queue: Arc::new(JobQueue::new("persistence", RetryPolicy::persistence())),
            tracker,
            staging,
        }
    }

    pub fn indexing_queue(&self) -> SharedJobQueue<IndexBatchJob> {
        self.indexing_queue.clone()
    }

    pub fn persistence_queue(&self) -> SharedJobQueue<PersistenceJob> {
        self.persistence_queue.clone()
    }

    /// `queueBulkIndexing(indexName, documents, options)`: partitions into
    /// batches, registers the operation with the tracker, and enqueues one
    /// `batch` job per batch plus one `drain-dirty-list` job for the whole
    /// operation.
    #[instrument(skip(self, documents), fields(index = %index_name, documents = documents.len()))]
    pub async fn queue_bulk_indexing(
        &self,
        index_name: &str,
        documents: Vec<Document>,
        options: &BulkIndexOptions,
        bulk_op_id: &str,
    ) -> Result<()> {
        let batch_size = options.batch_size.max(1);
        let total_documents = documents.len() as u32;
        let batches: Vec<Vec<Document>> = documents
            .chunks(batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total_batches = batches.len() as u32;

        let batch_ids: Vec<String> = (0..batches.len())
            .map(|i| format!("{bulk_op_id}-{i}"))
            .collect();

        self.tracker
            .create_operation(bulk_op_id, index_name, total_batches, batch_ids.clone(), total_documents)
            .await?;

        for (batch_id, documents) in batch_ids.into_iter().zip(batches.into_iter()) {
            self.indexing_queue.add(IndexBatchJob {
                index_name: index_name.to_string(),
                bulk_op_id: bulk_op_id.to_string(),
                batch_id,
                documents,
            });
        }

        self.persistence_queue.add(PersistenceJob::DrainDirtyList(DrainDirtyListJob {
            bulk_op_id: bulk_op_id.to_string(),
            index_name: index_name.to_string(),
        }));

        info!(total_batches, "bulk indexing queued");
        Ok(())
    }

    /// `queueSingleDocument` / `queueBatchDocuments`: wraps a small document
    /// set as a single one-batch bulk operation.
    pub async fn queue_documents(&self, index_name: &str, documents: Vec<Document>, bulk_op_id: &str) -> Result<()> {
        self.queue_bulk_indexing(index_name, documents, &BulkIndexOptions::default(), bulk_op_id).await
    }

    pub fn pause_queue(&self, queue: QueueName) {
        match queue {
            QueueName::Indexing => self.indexing_queue.pause(),
            QueueName::Persistence => self.persistence_queue.pause(),
        }
    }

    pub fn resume_queue(&self, queue: QueueName) {
        match queue {
            QueueName::Indexing => self.indexing_queue.resume(),
            QueueName::Persistence => self.persistence_queue.resume(),
        }
    }

    pub fn clean_queue(&self, queue: QueueName) {
        match queue {
            QueueName::Indexing => self.indexing_queue.clean(),
            QueueName::Persistence => self.persistence_queue.clean(),
        }
    }

    pub fn queue_stats(&self, queue: QueueName) -> crate::bulk::queue::QueueStats {
        match queue {
            QueueName::Indexing => self.indexing_queue.stats(),
            QueueName::Persistence => self.persistence_queue.stats(),
        }
    }

    pub fn reclaim_stalled(&self) {
        self.indexing_queue.reclaim_stalled();
        self.persistence_queue.reclaim_stalled();
    }

    /// `getQueueHealth`: a coarse up/degraded signal for both queues, derived
    /// from their running counters rather than tracked separately.
    pub fn queue_health(&self) -> QueueHealth {
        let indexing = self.indexing_queue.stats();
        let persistence = self.persistence_queue.stats();
        QueueHealth {
            indexing_backlog: indexing.pending + indexing.in_flight,
            persistence_backlog: persistence.pending + persistence.in_flight,
            indexing_failed: indexing.failed,
            persistence_failed: persistence.failed,
        }
    }

    /// `getDetailedQueueStats`: both queues' counters keyed by name, for a
    /// caller that wants indexing and persistence broken out together.
    pub fn detailed_queue_stats(&self) -> HashMap<&'static str, crate::bulk::queue::QueueStats> {
        let mut stats = HashMap::new();
        stats.insert("indexing", self.indexing_queue.stats());
        stats.insert("persistence", self.persistence_queue.stats());
        stats
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueueHealth {
    pub indexing_backlog: usize,
    pub persistence_backlog: usize,
    pub indexing_failed: u64,
    pub persistence_failed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueName {
    Indexing,
    Persistence,
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// One indexing-queue worker loop: pulls `IndexBatchJob`s, indexes each
/// document with `fromBulk = true`, stages the batch's term postings, marks
/// the batch indexed, and reports progress.
pub async fn run_indexing_worker(
    queue: SharedJobQueue<IndexBatchJob>,
    persistence_queue: SharedJobQueue<PersistenceJob>,
    service: Arc<IndexingService>,
    tracker: Arc<BulkOperationTracker>,
    staging: Arc<PayloadStaging>,
) {
    while !SHUTDOWN.load(Ordering::Relaxed) {
        let job = queue.pop().await;
        match process_index_batch(&job, &service, &tracker, &staging, &persistence_queue).await {
            Ok(()) => queue.mark_completed(|j| j.batch_id == job.batch_id),
            Err(err) => {
                tracing::warn!(batch = %job.batch_id, error = %err, "indexing batch failed");
                queue.mark_failed(|j| j.batch_id == job.batch_id);
            }
        }
    }
}

async fn process_index_batch(
    job: &IndexBatchJob,
    service: &IndexingService,
    tracker: &BulkOperationTracker,
    staging: &PayloadStaging,
    persistence_queue: &SharedJobQueue<PersistenceJob>,
) -> Result<()> {
    use crate::index::term_key::field_term;
    use rayon::prelude::*;

    // Documents within a batch share no mutable state (the hot tier and
    // stores are lock-guarded internally), so rayon fans the batch out
    // across a worker pool rather than indexing one document at a time.
    let per_document: Vec<Vec<String>> = job
        .documents
        .par_iter()
        .map(|document| service.index_document(&job.index_name, document, true).map(|o| o.dirty_term_keys))
        .collect::<Result<Vec<_>>>()?;

    let mut dirty_terms: Vec<String> = per_document.into_iter().flatten().collect();
    dirty_terms.sort();
    dirty_terms.dedup();

    // Snapshot each dirty term's current hot-tier postings (not just this
    // batch's additions): the remote merge is a full-entry upsert, so
    // persisting the live snapshot is what keeps it idempotent on retry.
    let mut term_postings: std::collections::HashMap<String, Vec<PostingEntry>> = std::collections::HashMap::new();
    for key in &dirty_terms {
        if let Some((_, field, term)) = crate::index::term_key::parse_term_key(key) {
            let snapshot = service.snapshot_postings(key);
            term_postings.insert(field_term(field, term), snapshot.into_entries());
        }
    }

    let payload = BatchTermsPayload {
        index_name: job.index_name.clone(),
        batch_id: job.batch_id.clone(),
        bulk_op_id: job.bulk_op_id.clone(),
        term_postings,
    };
    let persist_job = staging.stage(payload).await?;
    persistence_queue.add(PersistenceJob::PersistBatchTerms(persist_job));

    tracker.push_dirty_terms(&job.bulk_op_id, &dirty_terms).await?;
    tracker.mark_batch_indexed(&job.bulk_op_id).await?;

    // `index_document(.., fromBulk=true)` defers its document-count increment
    // to this commit path (spec §4.6 step 6) rather than applying it inline.
    service.apply_deferred_document_count(&job.index_name, job.documents.len() as i64)?;

    Ok(())
}

/// The persistence-queue worker loop: concurrency is always 1, enforced by
/// construction (only this function should ever drive `persistence_queue`).
pub async fn run_persistence_worker(queue: SharedJobQueue<PersistenceJob>, worker: Arc<PersistenceWorker>) {
    while !SHUTDOWN.load(Ordering::Relaxed) {
        let job = queue.pop().await;
        let result = match &job {
            PersistenceJob::DrainDirtyList(inner) => worker.drain_dirty_list(inner).await,
            PersistenceJob::PersistBatchTerms(inner) => worker.persist_batch_terms(inner).await,
        };
        match result {
            Ok(()) => queue.mark_completed(|j| job_eq(j, &job)),
            Err(err) => {
                tracing::warn!(error = %err, "persistence job failed");
                queue.mark_failed(|j| job_eq(j, &job));
            }
        }
    }
}

fn job_eq(a: &PersistenceJob, b: &PersistenceJob) -> bool {
    match (a, b) {
        (PersistenceJob::DrainDirtyList(x), PersistenceJob::DrainDirtyList(y)) => x.bulk_op_id == y.bulk_op_id,
        (PersistenceJob::PersistBatchTerms(x), PersistenceJob::PersistBatchTerms(y)) => x.payload_key == y.payload_key,
        _ => false,
    }
}
