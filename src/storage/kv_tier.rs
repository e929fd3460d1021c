use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use parking_lot::RwLock;

use crate::core::error::{Error, Result};

/// A local, single-node key-value store realized as an append-only,
/// CRC-checked log of length-prefixed records, with an in-memory index from
/// key to file offset rebuilt at open time by replaying the log.
///
/// Record framing on disk: `[key_len: u32][key][value_len: u32][value][crc32: u32]`.
/// Reads are served from the in-memory offset index plus a direct file read
/// at that offset, so a `put` is immediately visible to a subsequent `get`.
pub struct KvTier {
    path: PathBuf,
    file: RwLock<File>,
    index: RwLock<HashMap<String, u64>>,
    tombstones: RwLock<std::collections::HashSet<String>>,
}

const TOMBSTONE_MARKER: &[u8] = b"\0TOMBSTONE\0";

impl KvTier {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut index = HashMap::new();
        let mut tombstones = std::collections::HashSet::new();
        replay(&mut file, &mut index, &mut tombstones)?;

        Ok(KvTier {
            path,
            file: RwLock::new(file),
            index: RwLock::new(index),
            tombstones: RwLock::new(tombstones),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut file = self.file.write();
        let offset = file.seek(SeekFrom::End(0))?;
        write_record(&mut file, key, value)?;

        self.index.write().insert(key.to_string(), offset);
        self.tombstones.write().remove(key);
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let mut file = self.file.write();
        let offset = file.seek(SeekFrom::End(0))?;
        write_record(&mut file, key, TOMBSTONE_MARKER)?;

        self.index.write().insert(key.to_string(), offset);
        self.tombstones.write().insert(key.to_string());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.tombstones.read().contains(key) {
            return Ok(None);
        }
        let Some(&offset) = self.index.read().get(key) else {
            return Ok(None);
        };

        let mut file = self.file.write();
        let (_, value) = read_record_at(&mut file, offset)?;
        Ok(Some(value))
    }

    pub fn get_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let keys: Vec<String> = self
            .index
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(&key)? {
                results.push((key, value));
            }
        }
        Ok(results)
    }

    /// Rewrites the log keeping only the latest record per live key, dropping
    /// tombstoned and superseded entries.
    pub fn compact(&self) -> Result<()> {
        let mut file = self.file.write();
        let mut index = self.index.write();
        let tombstones = self.tombstones.read();

        let mut live: Vec<(String, u64)> = index
            .iter()
            .filter(|(k, _)| !tombstones.contains(*k))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        live.sort_by_key(|(_, offset)| *offset);

        let tmp_path = self.path.with_extension("compact");
        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut new_index = HashMap::new();
        for (key, offset) in live {
            let (_, value) = read_record_at(&mut file, offset)?;
            let new_offset = tmp.stream_position()?;
            write_record(&mut tmp, &key, &value)?;
            new_index.insert(key, new_offset);
        }
        tmp.sync_all()?;
        drop(tmp);

        std::fs::rename(&tmp_path, &self.path)?;
        *file = OpenOptions::new().create(true).read(true).append(true).open(&self.path)?;
        *index = new_index;
        drop(tombstones);
        self.tombstones.write().clear();

        Ok(())
    }
}

fn write_record(file: &mut File, key: &str, value: &[u8]) -> Result<()> {
    let key_bytes = key.as_bytes();
    let mut hasher = Hasher::new();
    hasher.update(key_bytes);
    hasher.update(value);
    let checksum = hasher.finalize();

    file.write_all(&(key_bytes.len() as u32).to_le_bytes())?;
    file.write_all(key_bytes)?;
    file.write_all(&(value.len() as u32).to_le_bytes())?;
    file.write_all(value)?;
    file.write_all(&checksum.to_le_bytes())?;
    Ok(())
}

fn read_record_at(file: &mut File, offset: u64) -> Result<(String, Vec<u8>)> {
    file.seek(SeekFrom::Start(offset))?;

    let key_len = read_u32(file)?;
    let mut key_bytes = vec![0u8; key_len as usize];
    file.read_exact(&mut key_bytes)?;

    let value_len = read_u32(file)?;
    let mut value = vec![0u8; value_len as usize];
    file.read_exact(&mut value)?;

    let expected_checksum = read_u32(file)?;
    let mut hasher = Hasher::new();
    hasher.update(&key_bytes);
    hasher.update(&value);
    if hasher.finalize() != expected_checksum {
        return Err(Error::new(
            crate::core::error::ErrorKind::Persistence,
            format!("checksum mismatch reading kv tier record at offset {offset}"),
        ));
    }

    let key = String::from_utf8(key_bytes)
        .map_err(|e| Error::new(crate::core::error::ErrorKind::Parse, e.to_string()))?;
    Ok((key, value))
}

fn read_u32(file: &mut File) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn replay(
    file: &mut File,
    index: &mut HashMap<String, u64>,
    tombstones: &mut std::collections::HashSet<String>,
) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    loop {
        let offset = file.stream_position()?;
        match read_record_at(file, offset) {
            Ok((key, value)) => {
                index.insert(key.clone(), offset);
                if value == TOMBSTONE_MARKER {
                    tombstones.insert(key);
                } else {
                    tombstones.remove(&key);
                }
            }
            Err(_) => break,
        }
    }
    file.seek(SeekFrom::End(0))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let tier = KvTier::open(dir.path().join("kv.log")).unwrap();
        tier.put("term:idx:title:fox", b"payload").unwrap();
        assert_eq!(tier.get("term:idx:title:fox").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn delete_shadows_earlier_value() {
        let dir = tempdir().unwrap();
        let tier = KvTier::open(dir.path().join("kv.log")).unwrap();
        tier.put("k", b"v").unwrap();
        tier.delete("k").unwrap();
        assert_eq!(tier.get("k").unwrap(), None);
    }

    #[test]
    fn get_by_prefix_returns_matching_keys_only() {
        let dir = tempdir().unwrap();
        let tier = KvTier::open(dir.path().join("kv.log")).unwrap();
        tier.put("term:idx:title:fox", b"1").unwrap();
        tier.put("term:idx:title:dog", b"2").unwrap();
        tier.put("stats:idx:total", b"3").unwrap();

        let matches = tier.get_by_prefix("term:idx:title:").unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn survives_reopen_by_replaying_the_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.log");
        {
            let tier = KvTier::open(&path).unwrap();
            tier.put("k", b"v1").unwrap();
            tier.put("k", b"v2").unwrap();
        }
        let reopened = KvTier::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn compact_drops_tombstones_and_superseded_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.log");
        let tier = KvTier::open(&path).unwrap();
        tier.put("a", b"1").unwrap();
        tier.put("a", b"2").unwrap();
        tier.put("b", b"1").unwrap();
        tier.delete("b").unwrap();

        tier.compact().unwrap();
        assert_eq!(tier.get("a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(tier.get("b").unwrap(), None);
    }
}
