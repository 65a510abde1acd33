//! Codec Pipeline
//!
//! The ordered transformation between live items and stored payload bytes.
//!
//! ## Layering
//! ```text
//! encode:  validate ──► json ──► compress ──► encrypt ──► bytes
//! decode:  bytes ──► decrypt ──► uncompress ──► json ──► item
//! ```
//!
//! Compression and encryption are capability stages with identity defaults;
//! a codec built from a plain config passes bytes straight through.

mod cipher;
mod compress;

pub use cipher::{BlockCipher, Cipher, IdentityCipher, IV_LEN};
pub use compress::{Compressor, IdentityCompressor, ZstdCompressor};

use serde_json::Value;

use crate::config::Config;
use crate::error::{KegError, Result};
use crate::schema::{self, Schema};

/// Serializer for one bucket: schema validation plus the stage stack
pub struct Codec {
    schema: Schema,
    compressor: Box<dyn Compressor>,
    cipher: Box<dyn Cipher>,
}

impl Codec {
    /// Codec with identity stages (no compression, no encryption)
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            compressor: Box::new(IdentityCompressor),
            cipher: Box::new(IdentityCipher),
        }
    }

    /// Codec with explicit stages
    pub fn with_stages(
        schema: Schema,
        compressor: Box<dyn Compressor>,
        cipher: Box<dyn Cipher>,
    ) -> Self {
        Self {
            schema,
            compressor,
            cipher,
        }
    }

    /// Build the stage stack described by a store config
    pub fn from_config(schema: Schema, config: &Config) -> Result<Self> {
        let compressor: Box<dyn Compressor> = if config.compress {
            Box::new(ZstdCompressor)
        } else {
            Box::new(IdentityCompressor)
        };

        let cipher: Box<dyn Cipher> = match (&config.password, &config.salt) {
            (Some(password), Some(salt)) => {
                Box::new(BlockCipher::new(password, salt, config.algorithm)?)
            }
            (None, None) => Box::new(IdentityCipher),
            _ => {
                return Err(KegError::Config(
                    "password and salt must be supplied together".to_string(),
                ))
            }
        };

        Ok(Self::with_stages(schema, compressor, cipher))
    }

    /// Validate and encode an item to its stored byte form
    pub fn encode(&self, item: &Value) -> Result<Vec<u8>> {
        schema::validate(&self.schema, item)?;
        let bytes = serde_json::to_vec(item)
            .map_err(|e| KegError::Codec(format!("payload encode failed: {}", e)))?;
        let bytes = self.compressor.compress(&bytes)?;
        self.cipher.encrypt(&bytes)
    }

    /// Decode stored bytes back into an item
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let bytes = self.cipher.decrypt(bytes)?;
        let bytes = self.compressor.uncompress(&bytes)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| KegError::Codec(format!("payload decode failed: {}", e)))
    }

    /// The schema items are validated against
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
