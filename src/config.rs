//! Configuration for kegdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KegError, Result};

/// Main configuration for a kegdb store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all bucket files
    /// Internal structure:
    ///   {path}/
    ///     ├── bucket.list            (bucket registry)
    ///     ├── {bucket}.{ts}.list     (per-bucket index file)
    ///     └── {bucket}.{ts}.data     (per-bucket data file)
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Enable the block-compression stage for stored payloads
    pub compress: bool,

    /// Password for the encryption stage; must be paired with `salt`
    pub password: Option<String>,

    /// Salt for password key derivation; must be paired with `password`
    pub salt: Option<String>,

    /// Block cipher used when encryption is enabled
    pub algorithm: CipherAlgorithm,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Read/write cache variant and sizing
    pub cache: CacheOptions,
}

/// Block cipher selection for the encryption stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    /// AES-256 in CBC mode (default)
    Aes256Cbc,

    /// AES-128 in CBC mode
    Aes128Cbc,
}

impl CipherAlgorithm {
    /// Derived key length in bytes for this cipher
    pub fn key_len(&self) -> usize {
        match self {
            CipherAlgorithm::Aes256Cbc => 32,
            CipherAlgorithm::Aes128Cbc => 16,
        }
    }
}

/// Cache variant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOptions {
    /// Bounded cache with least-recently-used eviction (default)
    Lru { capacity: usize },

    /// Unbounded in-memory map, no eviction
    Unbounded,

    /// Pass-through, disables caching entirely
    Disabled,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions::Lru { capacity: 100 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./kegdb_data"),
            compress: false,
            password: None,
            salt: None,
            algorithm: CipherAlgorithm::Aes256Cbc,
            cache: CacheOptions::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check cross-field consistency
    ///
    /// `password` and `salt` must be supplied together or not at all.
    pub fn validate(&self) -> Result<()> {
        match (&self.password, &self.salt) {
            (Some(_), None) => Err(KegError::Config(
                "password supplied without salt".to_string(),
            )),
            (None, Some(_)) => Err(KegError::Config(
                "salt supplied without password".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Whether the encryption stage is enabled
    pub fn cipher_enabled(&self) -> bool {
        self.password.is_some() && self.salt.is_some()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory for all bucket files
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Enable or disable the compression stage
    pub fn compress(mut self, compress: bool) -> Self {
        self.config.compress = compress;
        self
    }

    /// Set the encryption password (pair with `salt`)
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the key-derivation salt (pair with `password`)
    pub fn salt(mut self, salt: impl Into<String>) -> Self {
        self.config.salt = Some(salt.into());
        self
    }

    /// Set the block cipher used when encryption is enabled
    pub fn algorithm(mut self, algorithm: CipherAlgorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Set the cache variant
    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
