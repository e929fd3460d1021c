use std::collections::HashMap;

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document as BsonDocument};
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::index::posting::{PostingEntry, PostingList};

/// Posting lists never grow a chunk past this many entries. A term whose
/// postings exceed one chunk is split across several, ordered by `chunk_index`.
pub const MAX_POSTINGS_PER_CHUNK: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingChunk {
    pub index_name: String,
    pub term: String,
    pub chunk_index: u32,
    pub postings: HashMap<String, PostingEntry>,
    pub document_count: u32,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// The authoritative, Mongo-backed posting-list tier. Posting lists are
/// stored as capped chunks rather than one unbounded document per term, so a
/// hot term's postings never hit MongoDB's per-document size limit.
pub struct RemoteTier {
    chunks: Collection<PostingChunk>,
}

impl RemoteTier {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(RemoteTier {
            chunks: db.collection("posting_chunks"),
        })
    }

    fn chunk_filter(index_name: &str, term: &str, chunk_index: u32) -> BsonDocument {
        doc! { "index_name": index_name, "term": term, "chunk_index": chunk_index as i64 }
    }

    /// Loads every chunk for a term, ordered by `chunk_index`, merged into one
    /// logical posting list. Returns an empty list if no chunks exist.
    pub async fn read_term(&self, index_name: &str, term: &str) -> Result<PostingList> {
        let filter = doc! { "index_name": index_name, "term": term };
        let options = FindOptions::builder().sort(doc! { "chunk_index": 1 }).build();
        let mut cursor = self.chunks.find(filter, options).await?;

        let mut merged = PostingList::new();
        while let Some(chunk) = cursor.try_next().await? {
            for entry in chunk.postings.into_values() {
                merged.add_or_replace(entry);
            }
        }
        Ok(merged)
    }

    /// Full rewrite: partitions `postings` into chunks, upserts each, and
    /// deletes any chunk whose index is beyond the new chunk count.
    pub async fn replace_term(
        &self,
        index_name: &str,
        term: &str,
        postings: &PostingList,
    ) -> Result<()> {
        let entries: Vec<&PostingEntry> = postings.iter().collect();
        let chunks: Vec<&[&PostingEntry]> = entries.chunks(MAX_POSTINGS_PER_CHUNK).collect();

        for (chunk_index, chunk_entries) in chunks.iter().enumerate() {
            let postings_map: HashMap<String, PostingEntry> = chunk_entries
                .iter()
                .map(|e| (e.doc_id.0.clone(), (*e).clone()))
                .collect();

            let update = doc! {
                "$set": {
                    "index_name": index_name,
                    "term": term,
                    "chunk_index": chunk_index as i64,
                    "postings": mongodb::bson::to_bson(&postings_map)?,
                    "document_count": postings_map.len() as i64,
                    "last_updated": mongodb::bson::DateTime::now(),
                }
            };

            self.chunks
                .update_one(
                    Self::chunk_filter(index_name, term, chunk_index as u32),
                    update,
                    UpdateOptions::builder().upsert(true).build(),
                )
                .await?;
        }

        let delete_filter = doc! {
            "index_name": index_name,
            "term": term,
            "chunk_index": { "$gte": chunks.len() as i64 },
        };
        self.chunks.delete_many(delete_filter, None).await?;
        Ok(())
    }

    /// Atomic merge: chooses a target chunk (the last existing one if it has
    /// room, else the next index), then sets individual `postings.{docId}`
    /// fields in a single upsert. This never reads the existing chunk first,
    /// so a transient read failure can never erase data.
    pub async fn merge_entries(
        &self,
        index_name: &str,
        term: &str,
        entries: &[PostingEntry],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let target_chunk = self.last_chunk_with_room(index_name, term, entries.len()).await?;

        let mut set_doc = BsonDocument::new();
        for entry in entries {
            let value = mongodb::bson::to_bson(entry)?;
            set_doc.insert(format!("postings.{}", entry.doc_id.0), value);
        }
        set_doc.insert("index_name", index_name);
        set_doc.insert("term", term);
        set_doc.insert("chunk_index", target_chunk as i64);
        set_doc.insert("last_updated", mongodb::bson::DateTime::now());

        self.chunks
            .update_one(
                Self::chunk_filter(index_name, term, target_chunk),
                doc! { "$set": set_doc, "$inc": { "document_count": 0i64 } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;

        self.rebalance_if_oversized(index_name, term, target_chunk).await.ok();
        Ok(())
    }

    async fn last_chunk_with_room(&self, index_name: &str, term: &str, incoming: usize) -> Result<u32> {
        let filter = doc! { "index_name": index_name, "term": term };
        let options = FindOptions::builder().sort(doc! { "chunk_index": -1 }).limit(1).build();
        let mut cursor = self.chunks.find(filter, options).await?;

        match cursor.try_next().await? {
            Some(last) if last.postings.len() + incoming <= MAX_POSTINGS_PER_CHUNK => Ok(last.chunk_index),
            Some(last) => Ok(last.chunk_index + 1),
            None => Ok(0),
        }
    }

    /// If a merge pushed a chunk past the cap, re-split all of the term's
    /// chunks and rewrite them. Rebalance failure is non-fatal: the next
    /// merge retries the same work.
    async fn rebalance_if_oversized(&self, index_name: &str, term: &str, chunk_index: u32) -> Result<()> {
        let filter = Self::chunk_filter(index_name, term, chunk_index);
        let chunk = self.chunks.find_one(filter, None).await?;
        let Some(chunk) = chunk else { return Ok(()) };
        if chunk.postings.len() <= MAX_POSTINGS_PER_CHUNK {
            return Ok(());
        }

        let merged = self.read_term(index_name, term).await?;
        self.replace_term(index_name, term, &merged).await
    }

    /// Returns distinct term keys under `indexName:field:` whose value matches
    /// `prefix`, for wildcard queries. Implemented as a regex-anchored distinct
    /// scan rather than loading every posting.
    pub async fn prefix_scan(&self, index_name: &str, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("^{}", regex::escape(prefix));
        let filter = doc! {
            "index_name": index_name,
            "term": { "$regex": pattern },
        };
        let terms = self
            .chunks
            .distinct("term", filter, None)
            .await?
            .into_iter()
            .filter_map(|bson| bson.as_str().map(str::to_string))
            .collect();
        Ok(terms)
    }

    pub async fn delete_term(&self, index_name: &str, term: &str) -> Result<()> {
        self.chunks
            .delete_many(doc! { "index_name": index_name, "term": term }, None)
            .await?;
        Ok(())
    }

    /// Purges every chunk for an index, used by index deletion/clearing.
    pub async fn delete_index(&self, index_name: &str) -> Result<()> {
        self.chunks
            .delete_many(doc! { "index_name": index_name }, None)
            .await?;
        Ok(())
    }
}
