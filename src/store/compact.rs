use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::encoding::ValueCodec;
use crate::error::Result;

use super::Store;

impl<C: ValueCodec> Store<C> {
    /// Rewrites the data file to hold exactly one record per live key, with
    /// no tombstones and no expired records, then atomically replaces the
    /// original and reopens. Expiries are not carried over: every surviving
    /// record is rewritten as never-expiring.
    pub fn compact(&mut self) -> Result<()> {
        self.assert_open();
        let sibling_path = sibling_path(&self.path);
        if sibling_path.exists() {
            // Leftover from an interrupted compaction; it must not leak
            // records into this one.
            fs::remove_file(&sibling_path)?;
        }
        info!("compacting {:?} via {:?}", self.path, sibling_path);

        let mut sibling: Store<C> = Store::open_with(&sibling_path, self.options.clone())?;
        for key in self.keydir.snapshot_keys() {
            let value = self.get_bytes(&key)?;
            sibling.put_bytes(&key, &value)?;
        }
        self.close();
        sibling.close();

        // The rename is the single atomic visibility point; the original is
        // never removed first, so a crash leaves it intact.
        fs::rename(&sibling_path, &self.path)?;

        self.reopen()?;
        info!("compacted {:?}: {} live records", self.path, self.len_keys);
        Ok(())
    }

    /// Compacts once the live fraction recorded at the last open drops below
    /// `threshold`, provided that open saw more than the configured minimum
    /// number of records. The statistics refresh only at open, so this is
    /// most useful immediately after a reopen.
    pub fn auto_compact(&mut self, threshold: f64) -> Result<()> {
        if self.fill_ratio < threshold && self.cap_keys > self.options.min_compact_records {
            return self.compact();
        }
        Ok(())
    }
}

fn sibling_path(path: &Path) -> PathBuf {
    let mut sibling = path.as_os_str().to_os_string();
    sibling.push("~");
    PathBuf::from(sibling)
}
