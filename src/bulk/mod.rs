pub mod payload_staging;
pub mod persistence_worker;
pub mod pipeline;
pub mod queue;
pub mod tracker;

pub use payload_staging::{BatchTermsPayload, PayloadStaging, PersistBatchTermsJob};
pub use persistence_worker::{DrainDirtyListJob, PersistenceWorker};
pub use pipeline::{BulkIndexOptions, BulkPipeline, IndexBatchJob, PersistenceJob, QueueHealth, QueueName};
pub use queue::{JobQueue, QueueStats, RetryPolicy, SharedJobQueue};
pub use tracker::{BulkOperationRecord, BulkOperationStatus, BulkOperationTracker};
