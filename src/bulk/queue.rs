use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

/// Retry policy for one named job kind: exponential backoff, bounded attempts,
/// and a stalled-job reclaim interval (a job leased longer than this without
/// completing is assumed dead and requeued).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub stalled_interval: Duration,
}

impl RetryPolicy {
    pub fn indexing() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            stalled_interval: Duration::from_secs(120),
        }
    }

    pub fn persistence() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_millis(200),
            stalled_interval: Duration::from_secs(60),
        }
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.min(10))
    }
}

struct Lease<J> {
    job: J,
    attempt: u32,
    leased_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Paused,
}

/// A named in-process job queue. Jobs are pulled by worker loops the caller
/// drives (see `bulk::pipeline`); this type owns only the queueing, pause,
/// retry, and stalled-reclaim bookkeeping.
pub struct JobQueue<J: Clone + Send + 'static> {
    name: String,
    pending: Mutex<VecDeque<J>>,
    in_flight: Mutex<Vec<Lease<J>>>,
    state: Mutex<QueueState>,
    notify: Notify,
    policy: RetryPolicy,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl<J: Clone + Send + 'static> JobQueue<J> {
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        JobQueue {
            name: name.into(),
            pending: Mutex::new(VecDeque::new()),
            in_flight: Mutex::new(Vec::new()),
            state: Mutex::new(QueueState::Running),
            notify: Notify::new(),
            policy,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&self, job: J) {
        self.pending.lock().push_back(job);
        self.notify.notify_one();
    }

    pub fn pause(&self) {
        *self.state.lock() = QueueState::Paused;
    }

    pub fn resume(&self) {
        *self.state.lock() = QueueState::Running;
        self.notify.notify_waiters();
    }

    /// Drops all pending jobs. In-flight leases are left to finish or stall.
    pub fn clean(&self) {
        self.pending.lock().clear();
    }

    /// Waits for and removes the next job, honoring pause. Returns `None` only
    /// if the queue is permanently closed (not used in this core; retained for
    /// a future graceful-shutdown path).
    pub async fn pop(&self) -> J {
        loop {
            if *self.state.lock() == QueueState::Running {
                if let Some(job) = self.pending.lock().pop_front() {
                    self.in_flight.lock().push(Lease { job: job.clone(), attempt: 0, leased_at: Instant::now() });
                    return job;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn mark_completed(&self, matches: impl Fn(&J) -> bool) {
        self.in_flight.lock().retain(|lease| !matches(&lease.job));
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Requeues a job that failed, respecting the retry policy. Returns
    /// `false` (and does not requeue) once `max_attempts` is exhausted.
    pub fn mark_failed(&self, matches: impl Fn(&J) -> bool) -> bool {
        let mut in_flight = self.in_flight.lock();
        let Some(pos) = in_flight.iter().position(|l| matches(&l.job)) else {
            return false;
        };
        let mut lease = in_flight.remove(pos);
        lease.attempt += 1;

        if lease.attempt >= self.policy.max_attempts {
            self.failed.fetch_add(1, Ordering::Relaxed);
            warn!(queue = %self.name, attempts = lease.attempt, "job exhausted retries");
            false
        } else {
            self.pending.lock().push_back(lease.job);
            self.notify.notify_one();
            true
        }
    }

    /// Requeues any lease held longer than the policy's stalled interval.
    pub fn reclaim_stalled(&self) {
        let mut in_flight = self.in_flight.lock();
        let now = Instant::now();
        let mut i = 0;
        while i < in_flight.len() {
            if now.duration_since(in_flight[i].leased_at) >= self.policy.stalled_interval {
                let lease = in_flight.remove(i);
                warn!(queue = %self.name, "reclaiming stalled job");
                self.pending.lock().push_back(lease.job);
                self.notify.notify_one();
            } else {
                i += 1;
            }
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.lock().len(),
            in_flight: self.in_flight.lock().len(),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            state: *self.state.lock(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub completed: u64,
    pub failed: u64,
    pub state: QueueState,
}

pub type SharedJobQueue<J> = Arc<JobQueue<J>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_blocks_until_a_job_is_added() {
        let queue: JobQueue<u32> = JobQueue::new("test", RetryPolicy::indexing());
        queue.add(7);
        let job = queue.pop().await;
        assert_eq!(job, 7);
    }

    #[test]
    fn pause_prevents_pop_from_returning_even_with_pending_jobs() {
        let queue: JobQueue<u32> = JobQueue::new("test", RetryPolicy::indexing());
        queue.add(1);
        queue.pause();
        assert_eq!(queue.stats().pending, 1);
    }

    #[test]
    fn mark_failed_requeues_until_max_attempts_then_gives_up() {
        let queue: JobQueue<u32> = JobQueue::new("test", RetryPolicy { max_attempts: 2, base_backoff: Duration::from_millis(1), stalled_interval: Duration::from_secs(1) });
        queue.add(5);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let job = rt.block_on(queue.pop());
        assert_eq!(job, 5);

        assert!(queue.mark_failed(|j| *j == 5));
        let job = rt.block_on(queue.pop());
        assert!(!queue.mark_failed(|j| *j == job));
        assert_eq!(queue.stats().failed, 1);
    }
}
