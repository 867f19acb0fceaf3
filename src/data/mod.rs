pub mod record;

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use crate::error::Result;

use record::RECORD_HEADER_SIZE;

/// An open, append-only data file. `cpos` is the logical write position,
/// tracked in memory so value offsets can be computed without a stat after
/// every append. Positioned reads go through `read_at` and never move it.
#[derive(Debug)]
pub struct DataFile {
    file: File,
    path: PathBuf,
    cpos: u64,
}

impl DataFile {
    /// Opens the data file at `path`, creating it if missing.
    pub fn open(path: &Path, mode: u32) -> Result<Self> {
        let file = File::options()
            .create(true)
            .read(true)
            .append(true)
            .mode(mode)
            .open(path)?;
        let cpos = file.metadata()?.len();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            cpos,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical size of the file in bytes.
    pub fn len(&self) -> u64 {
        self.cpos
    }

    pub fn is_empty(&self) -> bool {
        self.cpos == 0
    }

    /// Appends one record with a single write and returns the offset and
    /// size of its value bytes within the file.
    pub fn append(&mut self, key: &[u8], value: &[u8], expiry: i32) -> Result<(u64, u32)> {
        let buf = record::encode_record(key, value, expiry);
        let value_offset = self.cpos + RECORD_HEADER_SIZE as u64 + key.len() as u64;

        self.file.write_all(&buf)?;
        self.cpos += buf.len() as u64;

        Ok((value_offset, value.len() as u32))
    }

    /// Reads exactly `size` bytes at `offset`. Does not perturb the append
    /// cursor, so reads and appends may interleave freely.
    pub fn read_at(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size as usize];
        self.file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Flushes file contents to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Sequential scan over record metadata from the start of the file,
    /// through an independent reader. Value bytes are skipped, not read.
    pub fn scan(&self) -> Result<RecordScan> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        Ok(RecordScan { reader, pos: 0 })
    }
}

/// One record's metadata as produced by a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedRecord {
    pub key: Vec<u8>,
    pub expiry: i32,
    pub value_offset: u64,
    pub value_size: u32,
}

pub struct RecordScan {
    reader: BufReader<File>,
    pos: u64,
}

impl RecordScan {
    fn read_next(&mut self) -> Result<Option<ScannedRecord>> {
        let meta = match record::read_record_meta(&mut self.reader)? {
            Some(meta) => meta,
            None => return Ok(None),
        };

        let value_offset = self.pos + RECORD_HEADER_SIZE as u64 + meta.key.len() as u64;
        self.reader.seek(SeekFrom::Current(meta.value_len as i64))?;
        self.pos = value_offset + meta.value_len as u64;

        Ok(Some(ScannedRecord {
            key: meta.key,
            expiry: meta.expiry,
            value_offset,
            value_size: meta.value_len,
        }))
    }
}

impl Iterator for RecordScan {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
