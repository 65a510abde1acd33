//! Compression stage
//!
//! Generic block compression applied between schema encoding and encryption.

use crate::error::{KegError, Result};

/// Block compressor capability
pub trait Compressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Pass-through stage used when compression is disabled
pub struct IdentityCompressor;

impl Compressor for IdentityCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Zstandard block compressor
pub struct ZstdCompressor;

impl ZstdCompressor {
    /// Fixed compression level for stored payloads
    const LEVEL: i32 = 3;
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(data, Self::LEVEL)
            .map_err(|e| KegError::Codec(format!("compression failed: {}", e)))
    }

    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data)
            .map_err(|e| KegError::Codec(format!("decompression failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trip() {
        let stage = IdentityCompressor;
        let data = b"unchanged bytes".to_vec();
        assert_eq!(stage.compress(&data).unwrap(), data);
        assert_eq!(stage.uncompress(&data).unwrap(), data);
    }

    #[test]
    fn zstd_round_trip() {
        let stage = ZstdCompressor;
        let data = b"repetitive payload ".repeat(64);
        let compressed = stage.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(stage.uncompress(&compressed).unwrap(), data);
    }

    #[test]
    fn zstd_rejects_garbage() {
        let stage = ZstdCompressor;
        assert!(matches!(
            stage.uncompress(b"not a zstd frame"),
            Err(KegError::Codec(_))
        ));
    }
}
