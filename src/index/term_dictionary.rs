use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::core::types::DocId;
use crate::index::posting::{PostingEntry, PostingList};

/// The in-memory hot tier: a fixed-capacity LRU from `index:field:term` to its
/// posting list. On eviction a term simply falls out of the cache; it remains
/// reachable through the durable tiers on the next read miss.
///
/// Dirty-term tracking for a bulk operation is not this type's job: the
/// indexing service already returns the exact set of keys an `index_document`
/// call touched, and the bulk pipeline threads that set through per-batch, so
/// it stays scoped to one bulk operation even when several run concurrently.
pub struct TermDictionary {
    cache: Mutex<LruCache<String, PostingList>>,
}

impl TermDictionary {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap();
        TermDictionary {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<PostingList> {
        self.cache.lock().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.cache.lock().contains(key)
    }

    /// Inserts `entry` into the posting list at `key`, creating an empty list
    /// on first use.
    pub fn add_posting(&self, key: &str, entry: PostingEntry) {
        let mut cache = self.cache.lock();
        if !cache.contains(key) {
            cache.put(key.to_string(), PostingList::new());
        }
        let list = cache.get_mut(key).expect("just inserted");
        list.add_or_replace(entry);
    }

    /// Overwrites the whole posting list at `key`, e.g. after a durable-tier read.
    pub fn put(&self, key: &str, list: PostingList) {
        self.cache.lock().put(key.to_string(), list);
    }

    pub fn remove_posting(&self, key: &str, doc_id: &DocId) -> bool {
        let mut cache = self.cache.lock();
        cache.get_mut(key).map(|list| list.remove(doc_id)).unwrap_or(false)
    }

    pub fn remove_term(&self, key: &str) {
        self.cache.lock().pop(key);
    }

    pub fn get_terms(&self) -> Vec<String> {
        self.cache.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

pub type SharedTermDictionary = Arc<TermDictionary>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_posting_creates_list_on_first_use() {
        let dict = TermDictionary::new(10);
        dict.add_posting("idx:title:fox", PostingEntry::new(DocId::new("1")));
        let list = dict.get("idx:title:fox").unwrap();
        assert_eq!(list.size(), 1);
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let dict = TermDictionary::new(1);
        dict.add_posting("idx:title:fox", PostingEntry::new(DocId::new("1")));
        dict.add_posting("idx:title:dog", PostingEntry::new(DocId::new("2")));
        assert!(!dict.has("idx:title:fox"));
        assert!(dict.has("idx:title:dog"));
    }
}
