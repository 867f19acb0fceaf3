use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Options;
use crate::encoding::{Json, ValueCodec};
use crate::error::Result;

use super::Store;

/// A thread-safe façade over [`Store`]: a single mutex, held for the whole
/// of every operation including its file IO, admits at most one caller at a
/// time into the core.
#[derive(Debug)]
pub struct SafeStore<C: ValueCodec = Json> {
    inner: Mutex<Store<C>>,
}

impl<C: ValueCodec> SafeStore<C> {
    /// Opens the store at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Store::open(path)?),
        })
    }

    /// Opens the store at `path` with the given options.
    pub fn open_with(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Store::open_with(path, options)?),
        })
    }

    /// Used by operations without a Result to report a poisoned lock
    /// through; a poisoned mutex means a previous caller panicked mid-write.
    fn lock(&self) -> std::sync::MutexGuard<'_, Store<C>> {
        self.inner.lock().expect("store mutex poisoned")
    }

    pub fn reopen(&self) -> Result<()> {
        self.inner.lock()?.reopen()
    }

    pub fn close(&self) {
        self.lock().close()
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.inner.lock()?.put(key, value)
    }

    pub fn put_for_days<T: Serialize>(&self, key: &str, value: &T, days: i32) -> Result<()> {
        self.inner.lock()?.put_for_days(key, value, days)
    }

    pub fn put_bytes(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.lock()?.put_bytes(key, value)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.inner.lock()?.get(key)
    }

    pub fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.lock()?.get_bytes(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.lock().exists(key)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.inner.lock()?.delete(key)
    }

    pub fn delete_all(&self, with: &str) -> Result<()> {
        self.inner.lock()?.delete_all(with)
    }

    pub fn get_keys(&self, with: &str, limit: isize) -> Vec<String> {
        self.lock().get_keys(with, limit)
    }

    /// Unsupported on the façade: handing out an iterator would let callers
    /// interleave with other threads against a snapshot they believe is
    /// current. Use `get_keys` instead.
    pub fn iterate(&self, _with: &str) -> ! {
        panic!("iterate is not supported on SafeStore, use get_keys");
    }

    /// Compacts the data file. The lock is held for the entire rewrite.
    pub fn compact(&self) -> Result<()> {
        self.inner.lock()?.compact()
    }

    pub fn auto_compact(&self, threshold: f64) -> Result<()> {
        self.inner.lock()?.auto_compact(threshold)
    }

    pub fn export_json<W: Write>(&self, w: &mut W) -> Result<()> {
        self.inner.lock()?.export_json(w)
    }

    pub fn export_keys_json<W: Write>(&self, w: &mut W, with: &str) -> Result<()> {
        self.inner.lock()?.export_keys_json(w, with)
    }

    pub fn export_key_json<W: Write>(&self, w: &mut W, key: &str) -> Result<()> {
        self.inner.lock()?.export_key_json(w, key)
    }

    pub fn import_json<R: Read>(&self, r: &mut R) -> Result<()> {
        self.inner.lock()?.import_json(r)
    }

    pub fn import_csv<R: Read>(&self, r: &mut R, key_index: usize) -> Result<()> {
        self.inner.lock()?.import_csv(r, key_index)
    }

    pub fn fill_ratio(&self) -> f64 {
        self.lock().fill_ratio()
    }

    pub fn cap_keys(&self) -> usize {
        self.lock().cap_keys()
    }

    pub fn len_keys(&self) -> usize {
        self.lock().len_keys()
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path().to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::NamedTempFile;

    fn create_temp_store() -> (NamedTempFile, SafeStore<Json>) {
        let temp = NamedTempFile::new().expect("failed to create temporary file");
        let store = SafeStore::open(temp.path()).expect("failed to open store");
        (temp, store)
    }

    #[test]
    fn test_basic_operations() {
        let (_temp, store) = create_temp_store();

        store.put("k", &1).unwrap();
        assert!(store.exists("k"));
        assert_eq!(store.get::<i64>("k").unwrap(), 1);

        store.delete("k").unwrap();
        assert!(!store.exists("k"));

        store.put("a", &1).unwrap();
        store.put("b", &2).unwrap();
        store.reopen().unwrap();
        assert_eq!(store.get_keys("", -1).len(), 2);

        store.compact().unwrap();
        assert_eq!(store.cap_keys(), 2);
        assert_eq!(store.len_keys(), 2);
        assert_eq!(store.fill_ratio(), 1.0);
    }

    #[test]
    fn test_concurrent_workers_observe_their_own_writes() {
        let (_temp, store) = create_temp_store();
        let workers = 4;
        let puts_per_worker = 50;

        thread::scope(|s| {
            for worker in 0..workers {
                let store = &store;
                s.spawn(move || {
                    for i in 0..puts_per_worker {
                        let key = format!("w{worker}_k{i}");
                        store.put(&key, &(worker * 1000 + i)).expect("put failed");
                        let read: i64 = store.get(&key).expect("get failed");
                        assert_eq!(read, (worker * 1000 + i) as i64);
                    }
                });
            }
        });

        // No lost writes across workers.
        assert_eq!(store.get_keys("", -1).len(), (workers * puts_per_worker) as usize);
        for worker in 0..workers {
            for i in 0..puts_per_worker {
                let read: i64 = store.get(&format!("w{worker}_k{i}")).expect("get failed");
                assert_eq!(read, (worker * 1000 + i) as i64);
            }
        }
    }

    #[test]
    #[should_panic(expected = "iterate is not supported")]
    fn test_iterate_unsupported() {
        let (_temp, store) = create_temp_store();
        store.iterate("");
    }
}
