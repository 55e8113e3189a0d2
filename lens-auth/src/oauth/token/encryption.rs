//! AES-256-GCM encryption for tokens stored at rest.
//!
//! The encryption key is a 32-byte key provided as a hex-encoded string
//! (64 characters). Each value gets a fresh random nonce which is prepended to
//! the ciphertext before base64 encoding.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;

use super::Storage;
use crate::error::{storage_error, Error, ErrorKind, StorageErrorKind};

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

fn encryption_err() -> Error {
    storage_error(StorageErrorKind::EncryptionFailed, "Token encryption failed")
}

fn decryption_err() -> Error {
    storage_error(StorageErrorKind::DecryptionFailed, "Token decryption failed")
}

/// Encrypts plaintext using AES-256-GCM with a random nonce.
///
/// # Returns
/// Base64-encoded string containing nonce + ciphertext
pub fn encrypt(plaintext: &str, key: &[u8; 32]) -> Result<String, Error> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| encryption_err())?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| encryption_err())?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend(ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypts a base64-encoded ciphertext that was produced by [`encrypt`].
pub fn decrypt(ciphertext_b64: &str, key: &[u8; 32]) -> Result<String, Error> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| decryption_err())?;

    let combined = BASE64.decode(ciphertext_b64).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::DecryptionFailed),
    })?;

    if combined.len() < NONCE_SIZE {
        return Err(decryption_err());
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext_bytes = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| decryption_err())?;

    String::from_utf8(plaintext_bytes).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::DecryptionFailed),
    })
}

/// Parses a 64-character hex key into raw key bytes.
pub fn parse_key(key_hex: &str) -> Result<[u8; 32], Error> {
    let bytes = hex::decode(key_hex).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::EncryptionFailed),
    })?;
    if bytes.len() != 32 {
        return Err(storage_error(
            StorageErrorKind::EncryptionFailed,
            "Encryption key must be 32 bytes (64 hex characters)",
        ));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Storage decorator that encrypts every value before handing it to the inner store.
///
/// Keys are stored in the clear; only values are encrypted.
pub struct EncryptedStorage<S: Storage> {
    inner: S,
    key: [u8; 32],
}

impl<S: Storage> EncryptedStorage<S> {
    /// Wrap `inner`, encrypting with the hex-encoded 32-byte `key_hex`.
    pub fn new(inner: S, key_hex: &str) -> Result<Self, Error> {
        Ok(Self {
            inner,
            key: parse_key(key_hex)?,
        })
    }
}

#[async_trait]
impl<S: Storage> Storage for EncryptedStorage<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.inner
            .get(key)
            .await?
            .map(|ciphertext| decrypt(&ciphertext, &self.key))
            .transpose()
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Error> {
        let ciphertext = encrypt(&value, &self.key)?;
        self.inner.set(key, ciphertext).await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.remove(key).await
    }
}
