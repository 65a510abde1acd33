//! Bucket Registry Module
//!
//! Name → (path prefix, schema) mapping for every bucket in the store.
//!
//! ## Responsibilities
//! - Persist the bucket list as a single file through the codec pipeline
//! - Derive each bucket's path prefix (`<root>/<name>.<millis>`)
//! - Unlink a bucket's index and data files when the bucket is deleted
//!
//! The registry file is the codec output of a `[{bucket, path, type}]`
//! entry list, validated against a fixed internal schema; `type` carries the
//! bucket's serialized schema.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tracing::debug;

use crate::codec::Codec;
use crate::config::Config;
use crate::error::{KegError, Result};
use crate::schema::{FieldDef, FieldType, Schema};

/// Registry file name under the store root
const REGISTRY_FILE: &str = "bucket.list";

/// A resolved bucket: everything the engine needs to open its files
#[derive(Debug, Clone)]
pub struct BucketHandle {
    /// Bucket name
    pub name: String,

    /// Path prefix; the index file is `<prefix>.list`, data `<prefix>.data`
    pub path: PathBuf,

    /// Item schema
    pub schema: Schema,
}

/// Durable name → bucket mapping
pub struct BucketRegistry {
    root: PathBuf,
    file: PathBuf,
    codec: Codec,
    buckets: HashMap<String, BucketHandle>,
}

impl BucketRegistry {
    /// Open or create the registry under the store root.
    ///
    /// The registry codec shares the store's compression/cipher stages, so
    /// an encrypted store also has an encrypted bucket list.
    pub fn open(config: &Config) -> Result<Self> {
        let root = config.path.clone();
        fs::create_dir_all(&root)?;

        let file = root.join(REGISTRY_FILE);
        let codec = Codec::from_config(registry_schema(), config)?;

        let buckets = if file.exists() {
            let bytes = fs::read(&file)?;
            parse_entries(&codec.decode(&bytes)?)?
        } else {
            HashMap::new()
        };

        debug!(root = %root.display(), buckets = buckets.len(), "registry loaded");
        Ok(Self {
            root,
            file,
            codec,
            buckets,
        })
    }

    /// Whether a bucket exists
    pub fn exists(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// Resolve a bucket
    pub fn get(&self, name: &str) -> Result<&BucketHandle> {
        self.buckets
            .get(name)
            .ok_or_else(|| KegError::NotFound(format!("bucket {}", name)))
    }

    /// Register a new bucket and persist the list
    pub fn create(&mut self, name: &str, schema: Schema) -> Result<()> {
        if self.exists(name) {
            return Err(KegError::AlreadyExists(format!("bucket {}", name)));
        }

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let path = self.root.join(format!("{}.{}", name, millis));

        self.buckets.insert(
            name.to_string(),
            BucketHandle {
                name: name.to_string(),
                path,
                schema,
            },
        );
        self.persist()?;
        debug!(bucket = %name, "bucket created");
        Ok(())
    }

    /// Drop a bucket, unlink its files, persist the list
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let handle = self
            .buckets
            .remove(name)
            .ok_or_else(|| KegError::NotFound(format!("bucket {}", name)))?;

        for suffix in [".list", ".data"] {
            let mut file = handle.path.as_os_str().to_os_string();
            file.push(suffix);
            let file = PathBuf::from(file);
            if file.exists() {
                fs::remove_file(&file)?;
            }
        }

        self.persist()?;
        debug!(bucket = %name, "bucket deleted");
        Ok(())
    }

    /// Rewrite the registry file from the in-memory map
    fn persist(&self) -> Result<()> {
        let mut handles: Vec<&BucketHandle> = self.buckets.values().collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));

        let mut entries = Vec::with_capacity(handles.len());
        for handle in handles {
            entries.push(json!({
                "bucket": handle.name,
                "path": handle.path.to_string_lossy(),
                "type": handle.schema.to_json()?,
            }));
        }

        let bytes = self.codec.encode(&Value::Array(entries))?;
        fs::write(&self.file, bytes)?;
        Ok(())
    }
}

/// Fixed internal schema for the registry's `{bucket, path, type}` entries
fn registry_schema() -> Schema {
    let mut fields = HashMap::new();
    fields.insert("bucket".to_string(), FieldDef::required(FieldType::String));
    fields.insert("path".to_string(), FieldDef::required(FieldType::String));
    fields.insert("type".to_string(), FieldDef::required(FieldType::String));
    Schema::array_of(FieldType::Object { fields })
}

fn parse_entries(list: &Value) -> Result<HashMap<String, BucketHandle>> {
    let entries = list.as_array().ok_or_else(|| {
        KegError::CorruptRecord("registry file does not hold an entry list".to_string())
    })?;

    let mut buckets = HashMap::with_capacity(entries.len());
    for entry in entries {
        let name = entry_field(entry, "bucket")?;
        let path = entry_field(entry, "path")?;
        let schema = Schema::from_json(entry_field(entry, "type")?)?;

        buckets.insert(
            name.to_string(),
            BucketHandle {
                name: name.to_string(),
                path: PathBuf::from(path),
                schema,
            },
        );
    }
    Ok(buckets)
}

fn entry_field<'a>(entry: &'a Value, field: &str) -> Result<&'a str> {
    entry.get(field).and_then(Value::as_str).ok_or_else(|| {
        KegError::CorruptRecord(format!("registry entry is missing '{}'", field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        Config::builder().path(dir.path()).build()
    }

    fn sample_schema() -> Schema {
        Schema::infer(&json!({ "name": "x", "age": 1 })).expect("inferable")
    }

    #[test]
    fn create_get_exists() {
        let dir = TempDir::new().unwrap();
        let mut registry = BucketRegistry::open(&config(&dir)).unwrap();

        assert!(!registry.exists("users"));
        registry.create("users", sample_schema()).unwrap();
        assert!(registry.exists("users"));

        let handle = registry.get("users").unwrap();
        assert_eq!(handle.name, "users");
        assert!(handle.path.starts_with(dir.path()));
    }

    #[test]
    fn duplicate_bucket_fails() {
        let dir = TempDir::new().unwrap();
        let mut registry = BucketRegistry::open(&config(&dir)).unwrap();
        registry.create("users", sample_schema()).unwrap();
        assert!(matches!(
            registry.create("users", sample_schema()),
            Err(KegError::AlreadyExists(_))
        ));
    }

    #[test]
    fn missing_bucket_fails() {
        let dir = TempDir::new().unwrap();
        let mut registry = BucketRegistry::open(&config(&dir)).unwrap();
        assert!(matches!(registry.get("ghost"), Err(KegError::NotFound(_))));
        assert!(matches!(
            registry.delete("ghost"),
            Err(KegError::NotFound(_))
        ));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path;
        {
            let mut registry = BucketRegistry::open(&config(&dir)).unwrap();
            registry.create("users", sample_schema()).unwrap();
            path = registry.get("users").unwrap().path.clone();
        }

        let registry = BucketRegistry::open(&config(&dir)).unwrap();
        let handle = registry.get("users").unwrap();
        assert_eq!(handle.path, path);
        assert_eq!(handle.schema, sample_schema());
    }

    #[test]
    fn encrypted_registry_round_trips() {
        let dir = TempDir::new().unwrap();
        let config = Config::builder()
            .path(dir.path())
            .compress(true)
            .password("password")
            .salt("this is a salt")
            .build();

        {
            let mut registry = BucketRegistry::open(&config).unwrap();
            registry.create("users", sample_schema()).unwrap();
        }

        let registry = BucketRegistry::open(&config).unwrap();
        assert!(registry.exists("users"));

        // a plain config cannot read the encrypted list
        let plain = Config::builder().path(dir.path()).build();
        assert!(BucketRegistry::open(&plain).is_err());
    }

    #[test]
    fn delete_unlinks_bucket_files() {
        let dir = TempDir::new().unwrap();
        let mut registry = BucketRegistry::open(&config(&dir)).unwrap();
        registry.create("users", sample_schema()).unwrap();

        let prefix = registry.get("users").unwrap().path.clone();
        let mut list = prefix.as_os_str().to_os_string();
        list.push(".list");
        let list = PathBuf::from(list);
        fs::write(&list, b"").unwrap();

        registry.delete("users").unwrap();
        assert!(!registry.exists("users"));
        assert!(!list.exists());
    }
}
