//! Data Store Module
//!
//! Physical payload storage for one bucket: an append-only file of
//! codec-encoded byte ranges with no record boundaries of its own — the
//! index is the only map into it.
//!
//! ## Update Policy
//! - New encoding fits the old region: overwrite in place, keep the start
//! - New encoding is larger: zero the old region, append at end-of-file
//!
//! The file never shrinks outside compaction; deletes zero-fill their range.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::codec::Codec;
use crate::error::{KegError, Result};
use crate::index::IndexRecord;

/// Where a payload landed in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Byte offset of the payload
    pub start: u64,

    /// Payload length in bytes
    pub length: u64,
}

/// Byte-range payload storage for one bucket
pub struct DataStore {
    path: PathBuf,
}

impl DataStore {
    /// Data store for a bucket path prefix (`<prefix>.data`)
    pub fn new(prefix: &Path) -> Self {
        let mut name = prefix.as_os_str().to_os_string();
        name.push(".data");
        Self {
            path: PathBuf::from(name),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode an item and append it, returning its placement
    pub fn create(&self, codec: &Codec, item: &Value) -> Result<Placement> {
        let bytes = codec.encode(item)?;
        let start = self.file_size()?;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        file.write_all(&bytes)?;

        Ok(Placement {
            start,
            length: bytes.len() as u64,
        })
    }

    /// Read exactly `length` bytes at `start` and decode them
    pub fn get(&self, codec: &Codec, start: u64, length: u64) -> Result<Value> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(start))?;

        let mut bytes = vec![0u8; length as usize];
        file.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                KegError::CorruptRecord(format!(
                    "short read of {} bytes at offset {} in {}",
                    length,
                    start,
                    self.path.display()
                ))
            } else {
                KegError::Io(e)
            }
        })?;

        codec.decode(&bytes)
    }

    /// Re-encode an item over its previous placement.
    ///
    /// Fits in place when the new encoding is no larger than the old one;
    /// otherwise the old region is zeroed and the new bytes are appended.
    pub fn update(&self, codec: &Codec, prev: Placement, item: &Value) -> Result<Placement> {
        let bytes = codec.encode(item)?;

        if bytes.len() as u64 <= prev.length {
            self.write_at(prev.start, &bytes)?;
            return Ok(Placement {
                start: prev.start,
                length: bytes.len() as u64,
            });
        }

        self.delete(prev.start, prev.length)?;
        let start = self.file_size()?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&bytes)?;

        Ok(Placement {
            start,
            length: bytes.len() as u64,
        })
    }

    /// Zero-fill a payload's byte range; the file keeps its size
    pub fn delete(&self, start: u64, length: u64) -> Result<()> {
        self.write_at(start, &vec![0u8; length as usize])
    }

    /// Rewrite the file with live payloads packed contiguously.
    ///
    /// Iterates `ordered_live` (the index's position ordering), copies each
    /// record's `[start, start+length)` range into a temporary file, and
    /// returns the new start offsets in the same order for the index to
    /// persist. Atomically replaces the original file.
    pub fn compress(&self, ordered_live: &[IndexRecord]) -> Result<Vec<u64>> {
        if ordered_live.is_empty() && !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".new");
        let tmp = PathBuf::from(tmp_name);

        let mut old = File::open(&self.path)?;
        let mut new = File::create(&tmp)?;
        let mut offset = 0u64;
        let mut starts = Vec::with_capacity(ordered_live.len());

        for record in ordered_live {
            old.seek(SeekFrom::Start(record.start))?;
            let mut bytes = vec![0u8; record.length as usize];
            old.read_exact(&mut bytes).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    KegError::CorruptRecord(format!(
                        "short read of {} bytes at offset {} during compaction of {}",
                        record.length,
                        record.start,
                        self.path.display()
                    ))
                } else {
                    KegError::Io(e)
                }
            })?;

            new.write_all(&bytes)?;
            starts.push(offset);
            offset += record.length;
        }

        new.sync_all()?;
        drop(new);
        drop(old);
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            records = ordered_live.len(),
            bytes = offset,
            "data file compacted"
        );
        Ok(starts)
    }

    fn file_size(&self) -> Result<u64> {
        if self.path.exists() {
            Ok(fs::metadata(&self.path)?.len())
        } else {
            Ok(0)
        }
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }
}
