pub mod compact;
pub mod recovery;
pub mod safe;

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Options;
use crate::data::DataFile;
use crate::encoding::{Json, ValueCodec};
use crate::error::{Error, Result};
use crate::keydir::Keydir;

pub use safe::SafeStore;

/// Expiries are whole day-numbers since the unix epoch.
const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the current day-number.
pub(crate) fn today() -> i32 {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    (seconds as i64 / SECONDS_PER_DAY) as i32
}

/// A single-file key-value store. Every mutation is appended to the data
/// file; an in-memory keydir maps each live key to the location of its
/// current value, and reads resolve through positioned IO into the file.
///
/// `fill_ratio`, `cap_keys` and `len_keys` are computed by the recovery scan
/// at open and are not updated by later mutations; `reopen` refreshes them.
///
/// Not safe for concurrent use. Wrap in [`SafeStore`] to share across
/// threads.
#[derive(Debug)]
pub struct Store<C: ValueCodec = Json> {
    path: PathBuf,
    options: Options,
    data: Option<DataFile>,
    keydir: Keydir,
    fill_ratio: f64,
    cap_keys: usize,
    len_keys: usize,
    _codec: PhantomData<C>,
}

impl<C: ValueCodec> Store<C> {
    /// Opens the store at `path` with default options, creating the data
    /// file if missing, and rebuilds the keydir from it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Options::default())
    }

    /// Opens the store at `path` with the given options.
    pub fn open_with(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            options,
            data: None,
            keydir: Keydir::new(),
            fill_ratio: 1.0,
            cap_keys: 0,
            len_keys: 0,
            _codec: PhantomData,
        };
        store.open_data()?;
        Ok(store)
    }

    /// Closes the store if open and re-opens the same path, rebuilding the
    /// keydir and refreshing the statistics. Expirations take effect only
    /// here: a running store keeps serving keys that were live at its last
    /// open.
    pub fn reopen(&mut self) -> Result<()> {
        self.close();
        self.open_data()
    }

    /// Flushes and closes the data file. Any further operation other than
    /// `reopen` will panic. Closing an already closed store is a no-op.
    pub fn close(&mut self) {
        if let Some(data) = self.data.take() {
            let _ = data.sync();
        }
    }

    fn open_data(&mut self) -> Result<()> {
        let data = DataFile::open(&self.path, self.options.file_mode)?;
        let recovered = recovery::rebuild(&data)?;

        self.keydir = recovered.keydir;
        self.cap_keys = recovered.total;
        self.len_keys = self.keydir.len();
        self.fill_ratio = if recovered.total == 0 {
            1.0
        } else {
            self.len_keys as f64 / recovered.total as f64
        };
        self.data = Some(data);

        debug!(
            "opened {:?}: {} live / {} total records, fill ratio {:.3}",
            self.path, self.len_keys, self.cap_keys, self.fill_ratio
        );
        Ok(())
    }

    fn assert_open(&self) {
        assert!(self.data.is_some(), "store is closed");
    }

    fn write_through(&mut self, key: &str, value: &[u8], expiry: i32) -> Result<()> {
        let data = self.data.as_mut().expect("store is closed");
        self.keydir.write_through(data, key, value, expiry)
    }

    /// Serializes `value` through the store's codec and writes it under
    /// `key`, which must not be empty.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.assert_open();
        if key.is_empty() {
            return Err(Error::BlankKey);
        }
        let bytes = C::encode(value)?;
        self.write_through(key, &bytes, 0)
    }

    /// Like `put`, but the record expires `days` days from now. Expiration
    /// is checked at open, so records only become invisible after a reopen
    /// on a later day.
    pub fn put_for_days<T: Serialize>(&mut self, key: &str, value: &T, days: i32) -> Result<()> {
        self.assert_open();
        if key.is_empty() {
            return Err(Error::BlankKey);
        }
        let bytes = C::encode(value)?;
        self.write_through(key, &bytes, today() + days)
    }

    /// Writes raw value bytes under `key`, bypassing the codec.
    pub fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.assert_open();
        if key.is_empty() {
            return Err(Error::BlankKey);
        }
        self.write_through(key, value, 0)
    }

    /// Retrieves the value for `key` and decodes it through the store's
    /// codec. Returns `Error::KeyNotFound` if the key is not live.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.get_bytes(key)?;
        C::decode(&bytes)
    }

    /// Retrieves the raw value bytes for `key`.
    pub fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let data = self.data.as_ref().expect("store is closed");
        let entry = self.keydir.get(key).ok_or(Error::KeyNotFound)?;
        data.read_at(entry.value_offset, entry.value_size)
    }

    /// True if `key` is live. Index lookup only, no file IO.
    pub fn exists(&self, key: &str) -> bool {
        self.assert_open();
        self.keydir.contains(key)
    }

    /// Appends a tombstone for `key` and drops it from the keydir. The
    /// tombstone is written even when the key is not live.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.write_through(key, &[], 0)
    }

    /// Tombstones every live key containing `with`; the empty string
    /// matches all keys. The key set is snapshotted before any write.
    pub fn delete_all(&mut self, with: &str) -> Result<()> {
        self.assert_open();
        for key in self.keydir.snapshot_keys() {
            if with.is_empty() || key.contains(with) {
                self.write_through(&key, &[], 0)?;
            }
        }
        Ok(())
    }

    /// Live keys containing `with`, up to `limit` of them; a negative limit
    /// returns all matches and zero returns none. Order is unspecified.
    pub fn get_keys(&self, with: &str, limit: isize) -> Vec<String> {
        self.assert_open();
        let mut keys = Vec::new();
        for key in self.keydir.keys() {
            if keys.len() as isize == limit {
                break;
            }
            if with.is_empty() || key.contains(with) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// Iterates over live keys containing `with`. The key set is
    /// snapshotted when the iterator is created; mutations made while
    /// iterating are not reflected.
    pub fn iterate(&self, with: &str) -> Keys {
        self.assert_open();
        Keys {
            keys: self.keydir.snapshot_keys().into_iter(),
            with: with.to_string(),
        }
    }

    /// Live keys divided by total records at the last open (1.0 when the
    /// file had no records).
    pub fn fill_ratio(&self) -> f64 {
        self.fill_ratio
    }

    /// Total number of records, live and dead, seen by the last open.
    pub fn cap_keys(&self) -> usize {
        self.cap_keys
    }

    /// Number of live keys at the last open.
    pub fn len_keys(&self) -> usize {
        self.len_keys
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Snapshot iterator over matching live keys. Single-consumer.
pub struct Keys {
    keys: std::vec::IntoIter<String>,
    with: String,
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let with = &self.with;
        self.keys.find(|key| with.is_empty() || key.contains(with.as_str()))
    }
}
