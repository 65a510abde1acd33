//! Engine Module
//!
//! The store orchestrator that binds all components.
//!
//! ## Responsibilities
//! - Resolve buckets through the registry, opening index/codec state lazily
//! - Derive item keys and generate ids
//! - Route CRUD through cache, index, and data store in order
//! - Coordinate the two-file compaction pass
//! - Serve paged listing and linear-scan filtering
//!
//! ## Concurrency Model
//! Single-process, single-writer-per-bucket: mutating operations take
//! `&mut self` and there is no internal locking. Every file operation is
//! synchronous open-write-close; a failure between the data-store step and
//! the index step of one operation can leave the two files inconsistent
//! (no two-phase guarantee).

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::bucket::BucketRegistry;
use crate::cache::{self, Cache};
use crate::codec::Codec;
use crate::config::Config;
use crate::data::{DataStore, Placement};
use crate::error::{KegError, Result};
use crate::schema::Schema;
use crate::index::{Index, IndexRecord, ItemKey};

/// Listing direction over a bucket's live records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Creation/load order
    #[default]
    Ascending,

    /// Exact reverse of creation/load order
    Descending,
}

/// Paging window for listing and filtering
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Records (or matches, when filtering) to skip
    pub offset: usize,

    /// Maximum records to return
    pub take: usize,

    /// Scan direction
    pub order: Order,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            take: 10,
            order: Order::Ascending,
        }
    }
}

/// One page of `get_items` output
#[derive(Debug)]
pub struct ItemPage {
    /// Total live records in the bucket, independent of the paging window
    pub count: usize,

    /// The `[offset, offset + take)` slice of the ordered records
    pub items: Vec<Value>,
}

/// One page of `filter_items` output
#[derive(Debug)]
pub struct FilteredPage {
    /// Whether a further match exists beyond this page
    pub more: bool,

    /// Up to `take` matches after skipping `offset` matches
    pub items: Vec<Value>,
}

/// Derive the 32-byte item key for a bucket + external id pair
pub fn item_key(bucket: &str, id: &str) -> ItemKey {
    let mut hasher = Sha256::new();
    hasher.update(bucket.as_bytes());
    hasher.update(b":");
    hasher.update(id.as_bytes());
    hasher.finalize().into()
}

/// Per-bucket runtime state, opened on first use
struct BucketState {
    index: Index,
    data: DataStore,
    codec: Codec,
}

/// The embedded bucket store
pub struct Store {
    config: Config,
    registry: BucketRegistry,
    state: HashMap<String, BucketState>,
    cache: Box<dyn Cache>,
}

impl Store {
    /// Open or create a store rooted at the configured path
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let registry = BucketRegistry::open(&config)?;
        let cache = cache::from_options(config.cache);

        info!(path = %config.path.display(), "store opened");
        Ok(Self {
            config,
            registry,
            state: HashMap::new(),
            cache,
        })
    }

    // =========================================================================
    // Bucket Operations
    // =========================================================================

    /// Register a bucket with an explicit schema
    pub fn create_bucket(&mut self, bucket: &str, schema: Schema) -> Result<()> {
        self.registry.create(bucket, schema)
    }

    /// Register a bucket with a schema inferred from an example item
    pub fn create_bucket_from_example(&mut self, bucket: &str, example: &Value) -> Result<()> {
        let schema = Schema::infer(example)?;
        self.registry.create(bucket, schema)
    }

    /// Whether a bucket exists
    pub fn exists_bucket(&self, bucket: &str) -> bool {
        self.registry.exists(bucket)
    }

    /// Drop a bucket and its files
    pub fn delete_bucket(&mut self, bucket: &str) -> Result<()> {
        self.state.remove(bucket);
        self.registry.delete(bucket)
    }

    // =========================================================================
    // Item Operations
    // =========================================================================

    /// Store a new item, returning its external id.
    ///
    /// The id comes from the item's `id` field when present (string or
    /// integer); otherwise a fresh UUID token is generated and injected
    /// into the stored object.
    pub fn create(&mut self, bucket: &str, item: &Value) -> Result<String> {
        let (id, stored) = resolve_id(item)?;
        let key = item_key(bucket, &id);

        let state = self.bucket_state(bucket)?;
        if state.index.exists(&key) {
            return Err(KegError::AlreadyExists(format!(
                "item with id={} in bucket {}",
                id, bucket
            )));
        }

        let placement = state.data.create(&state.codec, &stored)?;
        state.index.create(key, placement.start, placement.length)?;
        self.cache.set(key, stored);

        debug!(bucket = %bucket, id = %id, "item created");
        Ok(id)
    }

    /// Whether an item exists, by cache then index
    pub fn exists(&mut self, bucket: &str, id: &str) -> Result<bool> {
        let key = item_key(bucket, id);
        if self.cache.get(&key).is_some() {
            return Ok(true);
        }
        Ok(self.bucket_state(bucket)?.index.exists(&key))
    }

    /// Fetch an item by id
    pub fn get(&mut self, bucket: &str, id: &str) -> Result<Value> {
        let key = item_key(bucket, id);
        if let Some(item) = self.cache.get(&key) {
            return Ok(item);
        }

        let state = self.bucket_state(bucket)?;
        if !state.index.exists(&key) {
            return Err(item_not_found(bucket, id));
        }
        let record = *state.index.get(&key)?;
        let item = state.data.get(&state.codec, record.start, record.length)?;

        self.cache.set(key, item.clone());
        Ok(item)
    }

    /// Replace an item's content, keeping its id and index slot
    pub fn update(&mut self, bucket: &str, id: &str, item: &Value) -> Result<()> {
        let stored = stamped_with_id(item, id)?;
        let key = item_key(bucket, id);

        let state = self.bucket_state(bucket)?;
        if !state.index.exists(&key) {
            return Err(item_not_found(bucket, id));
        }
        let prev = *state.index.get(&key)?;

        let placement = state.data.update(
            &state.codec,
            Placement {
                start: prev.start,
                length: prev.length,
            },
            &stored,
        )?;
        state.index.update(&key, placement.start, placement.length)?;
        self.cache.set(key, stored);

        debug!(bucket = %bucket, id = %id, "item updated");
        Ok(())
    }

    /// Remove an item: zero its payload, tombstone its index slot
    pub fn delete(&mut self, bucket: &str, id: &str) -> Result<()> {
        let key = item_key(bucket, id);

        let state = self.bucket_state(bucket)?;
        if !state.index.exists(&key) {
            return Err(item_not_found(bucket, id));
        }
        let record = *state.index.get(&key)?;

        state.data.delete(record.start, record.length)?;
        state.index.delete(&key)?;
        self.cache.del(&key);

        debug!(bucket = %bucket, id = %id, "item deleted");
        Ok(())
    }

    /// Compact a bucket's index and data files in one coordinated pass.
    ///
    /// The data store walks the live records in index order and reports the
    /// new start offsets; the index persists them together with the new
    /// positions. Both files are replaced atomically, data first.
    pub fn compress(&mut self, bucket: &str) -> Result<()> {
        let state = self.bucket_state(bucket)?;
        let live = state.index.live_records();

        let new_starts = state.data.compress(&live)?;
        state.index.compress(&new_starts)?;

        info!(bucket = %bucket, records = live.len(), "bucket compacted");
        Ok(())
    }

    /// List one page of a bucket's items.
    ///
    /// `count` is the total live record count regardless of the window.
    pub fn get_items(&mut self, bucket: &str, options: ListOptions) -> Result<ItemPage> {
        self.bucket_state(bucket)?;
        let state = match self.state.get_mut(bucket) {
            Some(state) => state,
            None => return Err(KegError::NotFound(format!("bucket {}", bucket))),
        };

        let ordered = ordered_records(&state.index, options.order);
        let count = ordered.len();

        let mut items = Vec::new();
        for record in ordered.iter().skip(options.offset).take(options.take) {
            let item = match self.cache.get(&record.key) {
                Some(item) => item,
                None => {
                    let item = state.data.get(&state.codec, record.start, record.length)?;
                    self.cache.set(record.key, item.clone());
                    item
                }
            };
            items.push(item);
        }

        Ok(ItemPage { count, items })
    }

    /// Scan a bucket for items matching a predicate.
    ///
    /// Matches before `offset` are skipped, up to `take` are collected, and
    /// the scan stops early on the first match past the full window —
    /// reported as `more` rather than scanned to the end.
    pub fn filter_items<F>(
        &mut self,
        bucket: &str,
        filter: F,
        options: ListOptions,
    ) -> Result<FilteredPage>
    where
        F: Fn(&Value) -> bool,
    {
        self.bucket_state(bucket)?;
        let state = match self.state.get_mut(bucket) {
            Some(state) => state,
            None => return Err(KegError::NotFound(format!("bucket {}", bucket))),
        };

        let ordered = ordered_records(&state.index, options.order);

        let mut items = Vec::new();
        let mut more = false;
        let mut matched = 0usize;

        for record in &ordered {
            let item = match self.cache.get(&record.key) {
                Some(item) => item,
                None => state.data.get(&state.codec, record.start, record.length)?,
            };

            if !filter(&item) {
                continue;
            }

            if matched >= options.offset {
                if items.len() < options.take {
                    self.cache.set(record.key, item.clone());
                    items.push(item);
                    matched += 1;
                } else {
                    more = true;
                    break;
                }
            } else {
                matched += 1;
            }
        }

        Ok(FilteredPage { more, items })
    }

    /// Drop every cache entry; the next reads repopulate from disk
    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The store configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A bucket's index and data file paths
    pub fn bucket_files(&mut self, bucket: &str) -> Result<(PathBuf, PathBuf)> {
        let state = self.bucket_state(bucket)?;
        Ok((
            state.index.path().to_path_buf(),
            state.data.path().to_path_buf(),
        ))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Open (or fetch) the runtime state for a bucket
    fn bucket_state(&mut self, bucket: &str) -> Result<&mut BucketState> {
        if !self.state.contains_key(bucket) {
            let handle = self.registry.get(bucket)?;
            let index = Index::open(&handle.path)?;
            let data = DataStore::new(&handle.path);
            let codec = Codec::from_config(handle.schema.clone(), &self.config)?;

            self.state
                .insert(bucket.to_string(), BucketState { index, data, codec });
        }

        self.state
            .get_mut(bucket)
            .ok_or_else(|| KegError::NotFound(format!("bucket {}", bucket)))
    }
}

/// Live records in the requested scan order
fn ordered_records(index: &Index, order: Order) -> Vec<IndexRecord> {
    let mut records = index.live_records();
    if order == Order::Descending {
        records.reverse();
    }
    records
}

/// Resolve the external id for a new item, injecting a generated one if needed
fn resolve_id(item: &Value) -> Result<(String, Value)> {
    match item.get("id") {
        Some(id) => Ok((value_to_id(id)?, item.clone())),
        None => {
            let id = Uuid::new_v4().simple().to_string();
            let mut stored = item.clone();
            if let Value::Object(map) = &mut stored {
                map.insert("id".to_string(), Value::String(id.clone()));
            }
            Ok((id, stored))
        }
    }
}

/// Inject the addressed id into an update payload, rejecting a conflicting one
fn stamped_with_id(item: &Value, id: &str) -> Result<Value> {
    match item.get("id") {
        Some(existing) => {
            if value_to_id(existing)? != id {
                return Err(KegError::SchemaViolation(format!(
                    "item id does not match addressed id={}",
                    id
                )));
            }
            Ok(item.clone())
        }
        None => {
            let mut stored = item.clone();
            if let Value::Object(map) = &mut stored {
                map.insert("id".to_string(), Value::String(id.to_string()));
            }
            Ok(stored)
        }
    }
}

/// Canonical string form of an item's `id` field
fn value_to_id(id: &Value) -> Result<String> {
    match id {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(KegError::SchemaViolation(format!(
            "item id must be a string or number, got {}",
            other
        ))),
    }
}

fn item_not_found(bucket: &str, id: &str) -> KegError {
    KegError::NotFound(format!("item with id={} in bucket {}", id, bucket))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_keys_are_stable_and_distinct() {
        let key = item_key("users", "42");
        assert_eq!(key, item_key("users", "42"));
        assert_ne!(key, item_key("users", "43"));
        assert_ne!(key, item_key("posts", "42"));
    }

    #[test]
    fn numeric_ids_canonicalize_to_decimal_strings() {
        assert_eq!(value_to_id(&serde_json::json!(0)).unwrap(), "0");
        assert_eq!(value_to_id(&serde_json::json!(19)).unwrap(), "19");
        assert_eq!(value_to_id(&serde_json::json!("abc")).unwrap(), "abc");
        assert!(value_to_id(&serde_json::json!(true)).is_err());
    }
}
