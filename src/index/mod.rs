//! Index Module
//!
//! Durable key → payload-location mapping per bucket.
//!
//! ## Responsibilities
//! - Load the full index file into memory on open (fixed 58-byte slots)
//! - Append new records, rewrite updated records in place
//! - Tombstone deletions by clearing a single flag byte
//! - Compact the file down to live records, renumbering positions
//!
//! The file has no header; EOF determines the slot count. Tombstoned slots
//! keep their 58 bytes on disk (and their slot number) until compaction.

mod record;

pub use record::{pack_record, unpack_record, IndexRecord, ItemKey, KEY_LEN, RECORD_LEN};

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{KegError, Result};

use self::record::ACTIVE_OFFSET;

/// In-memory view of one bucket's index file
pub struct Index {
    /// Path of the backing `.list` file
    path: PathBuf,

    /// Live records by key
    records: HashMap<ItemKey, IndexRecord>,

    /// Total slots on disk, tombstones included; also the next append position
    slot_count: u64,
}

impl Index {
    /// Open or create the index for a bucket path prefix.
    ///
    /// A missing file is created empty. Otherwise every 58-byte slot is
    /// decoded; tombstoned slots are skipped when building the key map but
    /// still count toward the slot count.
    pub fn open(prefix: &Path) -> Result<Self> {
        let path = list_path(prefix);

        if !path.exists() {
            File::create(&path)?;
            return Ok(Self {
                path,
                records: HashMap::new(),
                slot_count: 0,
            });
        }

        let data = fs::read(&path)?;
        if data.len() % RECORD_LEN != 0 {
            return Err(KegError::CorruptRecord(format!(
                "index file {} has a trailing partial slot ({} bytes)",
                path.display(),
                data.len() % RECORD_LEN
            )));
        }

        let mut records = HashMap::new();
        for chunk in data.chunks_exact(RECORD_LEN) {
            if let Some(record) = unpack_record(chunk)? {
                records.insert(record.key, record);
            }
        }

        let slot_count = (data.len() / RECORD_LEN) as u64;
        debug!(
            path = %path.display(),
            slots = slot_count,
            live = records.len(),
            "index loaded"
        );

        Ok(Self {
            path,
            records,
            slot_count,
        })
    }

    /// Whether a key is live in this index
    pub fn exists(&self, key: &ItemKey) -> bool {
        self.records.contains_key(key)
    }

    /// Look up a live record
    pub fn get(&self, key: &ItemKey) -> Result<&IndexRecord> {
        self.records.get(key).ok_or_else(|| {
            KegError::NotFound(format!("index key {}", hex::encode(key)))
        })
    }

    /// Append a record for a new key at the next slot
    pub fn create(&mut self, key: ItemKey, start: u64, length: u64) -> Result<IndexRecord> {
        if self.exists(&key) {
            return Err(KegError::AlreadyExists(format!(
                "index key {}",
                hex::encode(key)
            )));
        }

        let record = IndexRecord {
            key,
            start,
            length,
            position: self.slot_count,
        };
        write_at(&self.path, record.position * RECORD_LEN as u64, &pack_record(&record))?;

        self.records.insert(key, record);
        self.slot_count += 1;
        Ok(record)
    }

    /// Rewrite an existing key's record in place.
    ///
    /// The record stays at its slot; only start/length change.
    pub fn update(&mut self, key: &ItemKey, start: u64, length: u64) -> Result<IndexRecord> {
        let record = self.records.get_mut(key).ok_or_else(|| {
            KegError::NotFound(format!("index key {}", hex::encode(key)))
        })?;

        record.start = start;
        record.length = length;
        let record = *record;
        write_at(&self.path, record.position * RECORD_LEN as u64, &pack_record(&record))?;
        Ok(record)
    }

    /// Tombstone a key: clear its active byte, keep the slot on disk
    pub fn delete(&mut self, key: &ItemKey) -> Result<()> {
        let record = self.records.remove(key).ok_or_else(|| {
            KegError::NotFound(format!("index key {}", hex::encode(key)))
        })?;

        let offset = record.position * RECORD_LEN as u64 + ACTIVE_OFFSET as u64;
        write_at(&self.path, offset, &[0])?;
        Ok(())
    }

    /// Live records ordered by position ascending.
    ///
    /// Positions are assigned monotonically and preserved by updates, so
    /// position order is creation/load order.
    pub fn live_records(&self) -> Vec<IndexRecord> {
        let mut live: Vec<IndexRecord> = self.records.values().copied().collect();
        live.sort_by_key(|record| record.position);
        live
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any live records exist
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total slots on disk, tombstones included
    pub fn slot_count(&self) -> u64 {
        self.slot_count
    }

    /// Rewrite the file with live records only.
    ///
    /// `new_starts` are the data-file offsets produced by the data store's
    /// compaction pass over [`Index::live_records`] — the two passes share
    /// one ordering so start and position stay consistent. Records are
    /// renumbered `0..N-1`; lengths are untouched. The rewrite goes to a
    /// temporary file that atomically replaces the original.
    pub fn compress(&mut self, new_starts: &[u64]) -> Result<()> {
        let live = self.live_records();
        if live.len() != new_starts.len() {
            return Err(KegError::CorruptRecord(format!(
                "compaction produced {} offsets for {} live records",
                new_starts.len(),
                live.len()
            )));
        }

        let tmp = sibling_path(&self.path, ".new");
        let mut file = File::create(&tmp)?;
        let mut rewritten = HashMap::with_capacity(live.len());

        for (slot, (record, &start)) in live.iter().zip(new_starts).enumerate() {
            let record = IndexRecord {
                key: record.key,
                start,
                length: record.length,
                position: slot as u64,
            };
            file.write_all(&pack_record(&record))?;
            rewritten.insert(record.key, record);
        }

        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;

        let dropped = self.slot_count - rewritten.len() as u64;
        self.slot_count = rewritten.len() as u64;
        self.records = rewritten;
        debug!(
            path = %self.path.display(),
            live = self.slot_count,
            dropped,
            "index compacted"
        );
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `<prefix>.list`
fn list_path(prefix: &Path) -> PathBuf {
    sibling_path(prefix, ".list")
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Positioned write with open-write-close semantics
fn write_at(path: &Path, offset: u64, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    Ok(())
}
