use std::collections::HashMap;

use crate::data::DataFile;
use crate::error::Result;

/// Location of a live key's current value within the data file.
///
/// Entries carry no file handle: the store owns the single open [`DataFile`]
/// and resolves reads through it. `stamp` mirrors the on-disk record's
/// expiry slot for API parity; recovery always re-reads the real expiry from
/// record headers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeydirEntry {
    pub value_offset: u64,
    pub value_size: u32,
    pub stamp: i64,
}

/// In-memory index mapping each live key to the location of its current
/// value. Iteration order is unspecified.
#[derive(Debug, Default)]
pub struct Keydir {
    keys: HashMap<String, KeydirEntry>,
}

impl Keydir {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&KeydirEntry> {
        self.keys.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn insert(&mut self, key: String, entry: KeydirEntry) {
        self.keys.insert(key, entry);
    }

    pub fn remove(&mut self, key: &str) {
        self.keys.remove(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.keys.keys()
    }

    /// An owned copy of the current key set, for callers that mutate the
    /// keydir while walking it.
    pub fn snapshot_keys(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    /// Appends a record to `file` and updates the index: an empty value is a
    /// tombstone and removes the key, anything else installs the new
    /// location. The record is appended even when the key is not currently
    /// live.
    pub fn write_through(
        &mut self,
        file: &mut DataFile,
        key: &str,
        value: &[u8],
        expiry: i32,
    ) -> Result<()> {
        let (value_offset, value_size) = file.append(key.as_bytes(), value, expiry)?;

        if value.is_empty() {
            self.keys.remove(key);
        } else {
            self.keys.insert(
                key.to_string(),
                KeydirEntry {
                    value_offset,
                    value_size,
                    stamp: 0,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_temp_data_file() -> (NamedTempFile, DataFile) {
        let temp = NamedTempFile::new().expect("failed to create temporary file");
        let data = DataFile::open(temp.path(), 0o766).expect("failed to open data file");
        (temp, data)
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut keydir = Keydir::new();
        let entry = KeydirEntry {
            value_offset: 20,
            value_size: 6,
            stamp: 0,
        };

        keydir.insert("key1".to_string(), entry);
        assert!(keydir.contains("key1"));
        assert_eq!(keydir.get("key1"), Some(&entry));
        assert_eq!(keydir.len(), 1);

        keydir.remove("key1");
        assert!(!keydir.contains("key1"));
        assert!(keydir.is_empty());
    }

    #[test]
    fn test_write_through_installs_entry() {
        let (_temp, mut data) = create_temp_data_file();
        let mut keydir = Keydir::new();

        keydir
            .write_through(&mut data, "key1", b"value1", 0)
            .expect("write failed");

        let entry = keydir.get("key1").expect("missing entry");
        assert_eq!(data.read_at(entry.value_offset, entry.value_size).unwrap(), b"value1");
        assert_eq!(entry.stamp, 0);
    }

    #[test]
    fn test_write_through_tombstone_removes() {
        let (_temp, mut data) = create_temp_data_file();
        let mut keydir = Keydir::new();

        keydir
            .write_through(&mut data, "key1", b"value1", 0)
            .expect("write failed");
        let len_after_put = data.len();

        keydir
            .write_through(&mut data, "key1", b"", 0)
            .expect("write failed");

        assert!(!keydir.contains("key1"));
        // The tombstone is persisted, not just dropped from the index.
        assert!(data.len() > len_after_put);
    }

    #[test]
    fn test_write_through_tombstone_for_absent_key_still_appends() {
        let (_temp, mut data) = create_temp_data_file();
        let mut keydir = Keydir::new();

        keydir
            .write_through(&mut data, "ghost", b"", 0)
            .expect("write failed");

        assert!(!keydir.contains("ghost"));
        assert!(data.len() > 0);
    }
}
