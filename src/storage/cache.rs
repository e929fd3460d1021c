use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::core::error::Result;

/// Wraps a Redis connection for the remote in-memory cache: payload staging
/// for large bulk-indexing job bodies, a pending-jobs table mirror, the
/// per-bulk-operation dirty-term list, and a mirror of bulk-operation tracker
/// records so the tracker survives a process restart.
pub struct RedisCache {
    conn: ConnectionManager,
}

fn payload_key(key: &str) -> String {
    format!("payload:{key}")
}

fn pending_jobs_key() -> &'static str {
    "pending-jobs"
}

fn dirty_list_key(bulk_op_id: &str) -> String {
    format!("dirty-terms:{bulk_op_id}")
}

fn tracker_key(bulk_op_id: &str) -> String {
    format!("bulk-op:{bulk_op_id}")
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(RedisCache { conn })
    }

    /// Stages a payload under a caller-chosen key. The job message that gets
    /// enqueued carries only this key, never the payload itself.
    pub async fn stage_payload<T: Serialize>(&self, key: &str, payload: &T) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(payload)?;
        conn.set(payload_key(key), json).await?;
        Ok(())
    }

    pub async fn read_payload<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(payload_key(key)).await?;
        Ok(match raw {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    pub async fn delete_payload(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del(payload_key(key)).await?;
        Ok(())
    }

    /// Durable fallback for payload staging: a hash field per pending job keyed
    /// by `payloadKey`, so a payload surviving in the cache but lost from the
    /// queue message can still be found.
    pub async fn mirror_pending_job<T: Serialize>(&self, payload_key: &str, payload: &T) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(payload)?;
        conn.hset(pending_jobs_key(), payload_key, json).await?;
        Ok(())
    }

    pub async fn read_pending_job<T: DeserializeOwned>(&self, payload_key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(pending_jobs_key(), payload_key).await?;
        Ok(match raw {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    pub async fn remove_pending_job(&self, payload_key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hdel(pending_jobs_key(), payload_key).await?;
        Ok(())
    }

    /// Pops the oldest pending job reference, for the recovery path triggered
    /// when a job message was evicted but its pending reference survived.
    pub async fn pop_oldest_pending_job(&self) -> Result<Option<(String, String)>> {
        let mut conn = self.conn.clone();
        let all: std::collections::HashMap<String, String> = conn.hgetall(pending_jobs_key()).await?;
        Ok(all.into_iter().next())
    }

    /// Appends terms to the right of the bulk operation's durable dirty list.
    pub async fn push_dirty_terms(&self, bulk_op_id: &str, terms: &[String]) -> Result<()> {
        if terms.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.rpush(dirty_list_key(bulk_op_id), terms).await?;
        Ok(())
    }

    /// Pops up to `n` terms from the left of the dirty list.
    pub async fn pop_dirty_terms_batch(&self, bulk_op_id: &str, n: usize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let popped: Vec<String> = conn.lpop(dirty_list_key(bulk_op_id), std::num::NonZeroUsize::new(n)).await?;
        Ok(popped)
    }

    pub async fn dirty_list_length(&self, bulk_op_id: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(dirty_list_key(bulk_op_id)).await?;
        Ok(len)
    }

    pub async fn delete_dirty_list(&self, bulk_op_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del(dirty_list_key(bulk_op_id)).await?;
        Ok(())
    }

    /// Mirrors a bulk-operation tracker record so a restart can rehydrate it.
    pub async fn mirror_tracker_record<T: Serialize>(&self, bulk_op_id: &str, record: &T) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(record)?;
        conn.set(tracker_key(bulk_op_id), json).await?;
        Ok(())
    }

    pub async fn read_tracker_record<T: DeserializeOwned>(&self, bulk_op_id: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(tracker_key(bulk_op_id)).await?;
        Ok(match raw {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }
}
