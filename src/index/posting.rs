use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::DocId;

/// One document's membership in a term's posting list.
///
/// `frequency`/`positions` are placeholders written by the indexing service
/// (`frequency=1, positions=[]`); scoring never reads them back from here —
/// it reads `ProcessedDocument::fields` instead. `metadata` carries small
/// per-entry extras, e.g. `field` on the `_all` mirror entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub frequency: u32,
    pub positions: Vec<u32>,
    pub metadata: HashMap<String, String>,
}

impl PostingEntry {
    pub fn new(doc_id: DocId) -> Self {
        PostingEntry {
            doc_id,
            frequency: 1,
            positions: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// An ordered set of posting entries for one term, unique by `doc_id`.
/// Order is insertion order, not sorted by doc id — entries added later via
/// `add` land at the end, and `replace` updates in place without reordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostingList {
    entries: Vec<PostingEntry>,
    #[serde(skip)]
    index: HashMap<DocId, usize>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList::default()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.doc_id.clone(), i))
            .collect();
    }

    fn index_of(&self, doc_id: &DocId) -> Option<usize> {
        if self.index.len() == self.entries.len() {
            return self.index.get(doc_id).copied();
        }
        self.entries.iter().position(|e| &e.doc_id == doc_id)
    }

    /// Inserts a new entry, or replaces the existing entry for the same doc id.
    pub fn add_or_replace(&mut self, entry: PostingEntry) {
        if let Some(pos) = self.index_of(&entry.doc_id) {
            self.entries[pos] = entry;
        } else {
            self.index.insert(entry.doc_id.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Removes the entry for `doc_id`, if present. Returns whether it was removed.
    pub fn remove(&mut self, doc_id: &DocId) -> bool {
        if let Some(pos) = self.index_of(doc_id) {
            self.entries.remove(pos);
            self.rebuild_index();
            true
        } else {
            false
        }
    }

    pub fn get(&self, doc_id: &DocId) -> Option<&PostingEntry> {
        self.index_of(doc_id).map(|pos| &self.entries[pos])
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.index_of(doc_id).is_some()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostingEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<PostingEntry> {
        self.entries
    }

    pub fn from_entries(entries: Vec<PostingEntry>) -> Self {
        let mut list = PostingList { entries, index: HashMap::new() };
        list.rebuild_index();
        list
    }

    /// Merges another posting list's entries in, later entries winning on conflict.
    /// Used to fold durable-tier chunks together into one logical list.
    pub fn merge(&mut self, other: PostingList) {
        for entry in other.entries {
            self.add_or_replace(entry);
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.entries)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let entries: Vec<PostingEntry> = serde_json::from_slice(bytes)?;
        Ok(PostingList::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocId {
        DocId::new(id)
    }

    #[test]
    fn add_or_replace_keeps_doc_ids_unique() {
        let mut list = PostingList::new();
        list.add_or_replace(PostingEntry::new(doc("a")));
        list.add_or_replace(PostingEntry::new(doc("b")));
        list.add_or_replace(PostingEntry::new(doc("a")).with_metadata("field", "title"));

        assert_eq!(list.size(), 2);
        assert_eq!(list.get(&doc("a")).unwrap().metadata["field"], "title");
    }

    #[test]
    fn remove_drops_entry_and_reports_presence() {
        let mut list = PostingList::new();
        list.add_or_replace(PostingEntry::new(doc("a")));
        assert!(list.remove(&doc("a")));
        assert!(!list.remove(&doc("a")));
        assert!(list.is_empty());
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut list = PostingList::new();
        list.add_or_replace(PostingEntry::new(doc("a")));
        list.add_or_replace(PostingEntry::new(doc("b")));

        let bytes = list.to_bytes().unwrap();
        let restored = PostingList::from_bytes(&bytes).unwrap();
        assert_eq!(restored.size(), 2);
        assert!(restored.contains(&doc("a")));
    }

    #[test]
    fn merge_folds_chunks_together_preserving_uniqueness() {
        let mut a = PostingList::new();
        a.add_or_replace(PostingEntry::new(doc("a")));
        let mut b = PostingList::new();
        b.add_or_replace(PostingEntry::new(doc("b")));
        a.merge(b);
        assert_eq!(a.size(), 2);
    }
}
