//! Encryption stage
//!
//! Symmetric AES-CBC encryption keyed by a password-derived key.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ IV (16)  │ Ciphertext (PKCS#7 padded)  │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! The key is derived with PBKDF2-HMAC-SHA1 over password+salt at a fixed
//! iteration count; every `encrypt` call draws a fresh random IV, so equal
//! plaintexts produce distinct ciphertexts.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha1::Sha1;

use crate::config::CipherAlgorithm;
use crate::error::{KegError, Result};

/// Initialization vector length prepended to every ciphertext
pub const IV_LEN: usize = 16;

/// PBKDF2 iteration count — a storage format constant, kept stable so
/// existing files stay readable
const PBKDF2_ROUNDS: u32 = 64;

/// Cipher capability
pub trait Cipher {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Pass-through stage used when encryption is disabled
pub struct IdentityCipher;

impl Cipher for IdentityCipher {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// AES-CBC cipher with a password-derived key
pub struct BlockCipher {
    algorithm: CipherAlgorithm,
    key: Vec<u8>,
}

impl BlockCipher {
    /// Derive the key from password and salt
    pub fn new(password: &str, salt: &str, algorithm: CipherAlgorithm) -> Result<Self> {
        if password.is_empty() || salt.is_empty() {
            return Err(KegError::Config(
                "password and salt must be non-empty".to_string(),
            ));
        }

        let mut key = vec![0u8; algorithm.key_len()];
        pbkdf2_hmac::<Sha1>(
            password.as_bytes(),
            salt.as_bytes(),
            PBKDF2_ROUNDS,
            &mut key,
        );

        Ok(Self { algorithm, key })
    }
}

impl Cipher for BlockCipher {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = match self.algorithm {
            CipherAlgorithm::Aes256Cbc => {
                cbc::Encryptor::<aes::Aes256>::new_from_slices(&self.key, &iv)
                    .map_err(|e| KegError::Codec(format!("cipher init failed: {}", e)))?
                    .encrypt_padded_vec_mut::<Pkcs7>(data)
            }
            CipherAlgorithm::Aes128Cbc => {
                cbc::Encryptor::<aes::Aes128>::new_from_slices(&self.key, &iv)
                    .map_err(|e| KegError::Codec(format!("cipher init failed: {}", e)))?
                    .encrypt_padded_vec_mut::<Pkcs7>(data)
            }
        };

        let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < IV_LEN {
            return Err(KegError::Codec(format!(
                "ciphertext too short: {} bytes, need at least {} for the IV",
                data.len(),
                IV_LEN
            )));
        }

        let (iv, body) = data.split_at(IV_LEN);
        match self.algorithm {
            CipherAlgorithm::Aes256Cbc => {
                cbc::Decryptor::<aes::Aes256>::new_from_slices(&self.key, iv)
                    .map_err(|e| KegError::Codec(format!("cipher init failed: {}", e)))?
                    .decrypt_padded_vec_mut::<Pkcs7>(body)
                    .map_err(|e| KegError::Codec(format!("decryption failed: {}", e)))
            }
            CipherAlgorithm::Aes128Cbc => {
                cbc::Decryptor::<aes::Aes128>::new_from_slices(&self.key, iv)
                    .map_err(|e| KegError::Codec(format!("cipher init failed: {}", e)))?
                    .decrypt_padded_vec_mut::<Pkcs7>(body)
                    .map_err(|e| KegError::Codec(format!("decryption failed: {}", e)))
            }
        }
    }
}
