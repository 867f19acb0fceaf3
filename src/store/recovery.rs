use log::debug;

use crate::data::DataFile;
use crate::error::Result;
use crate::keydir::{Keydir, KeydirEntry};

use super::today;

/// The outcome of a recovery scan: the rebuilt keydir plus the total number
/// of records seen, live or dead.
pub struct Recovery {
    pub keydir: Keydir,
    pub total: usize,
}

/// Rebuilds the keydir by scanning the data file in record order. Because
/// records are visited in the order they were appended, the last surviving
/// record for a key wins: later puts shadow earlier ones, a tombstone drops
/// the key, and a record whose expiry day has passed drops it too. A record
/// that fails to decode aborts recovery; the file is not truncated.
pub fn rebuild(data: &DataFile) -> Result<Recovery> {
    let mut keydir = Keydir::new();
    let mut total = 0;
    let today = today();

    for record in data.scan()? {
        let record = record?;
        let key = String::from_utf8_lossy(&record.key).into_owned();

        if record.value_size == 0 {
            // deleted value
            keydir.remove(&key);
        } else if record.expiry != 0 && record.expiry < today {
            // this value has expired
            keydir.remove(&key);
        } else {
            keydir.insert(
                key,
                KeydirEntry {
                    value_offset: record.value_offset,
                    value_size: record.value_size,
                    stamp: 0,
                },
            );
        }
        total += 1;
    }

    debug!(
        "recovered {:?}: {} live of {} records",
        data.path(),
        keydir.len(),
        total
    );
    Ok(Recovery { keydir, total })
}
