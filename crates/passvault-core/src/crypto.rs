//! Record field cipher for `passvault`.
//!
//! Provides AES-256-GCM authenticated encryption of the password field,
//! HKDF-SHA256 derivation of the field key from the configured secret, and a
//! zeroize-on-drop key newtype.
//!
//! # Security model
//!
//! - Every encryption generates a fresh 96-bit nonce via `OsRng`.
//! - Wire format: `base64(nonce (12 bytes) || ciphertext || tag (16 bytes))`.
//! - The field key is derived once per codec with info `passvault-record-v1`.
//! - Decryption never panics. Callers that render records use
//!   [`CipherCodec::open_password`], which folds every failure into
//!   [`Password::Undecryptable`].

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::record::Password;

/// Minimum ciphertext length: 12-byte nonce + 16-byte AES-GCM tag.
const MIN_CIPHERTEXT_LEN: usize = 12 + 16;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// HKDF context for the record password field.
const RECORD_KEY_INFO: &[u8] = b"passvault-record-v1";

/// A 256-bit encryption key that is zeroized on drop.
///
/// The inner bytes are never exposed in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Derive the record field key from the externally supplied secret.
    ///
    /// Every client configured with the same secret derives the same key,
    /// so records written on one device open on another.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptyKey`] for an empty secret, or
    /// [`CryptoError::KeyDerivation`] if HKDF expansion fails.
    pub fn from_secret(secret: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        let hk = Hkdf::<Sha256>::new(None, secret.as_bytes());
        let mut derived = [0u8; 32];
        hk.expand(RECORD_KEY_INFO, &mut derived)
            .map_err(|e| CryptoError::KeyDerivation {
                context: String::from_utf8_lossy(RECORD_KEY_INFO).into_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self(derived))
    }

    /// Borrow the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts and decrypts a single string field with a fixed key.
///
/// Stateless apart from the key; cheap to clone.
#[derive(Clone, Debug)]
pub struct CipherCodec {
    key: EncryptionKey,
}

impl CipherCodec {
    /// Codec for an already-derived key.
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Codec for the configured secret.
    ///
    /// # Errors
    ///
    /// See [`EncryptionKey::from_secret`].
    pub fn from_secret(secret: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(EncryptionKey::from_secret(secret)?))
    }

    /// Encrypt a plaintext field into its base64 wire form.
    ///
    /// Two calls with the same input produce different output.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let sealed = encrypt(&self.key, plaintext.as_bytes())?;
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt a base64 wire value produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - [`CryptoError::Encoding`] if the input is not base64.
    /// - [`CryptoError::CiphertextTooShort`] if it cannot hold nonce + tag.
    /// - [`CryptoError::Decryption`] on a wrong key or tampered data.
    /// - [`CryptoError::NotUtf8`] if the plaintext is not a string.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| CryptoError::Encoding {
                reason: e.to_string(),
            })?;
        let plaintext = decrypt(&self.key, &combined)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)
    }

    /// Decrypt a stored password, mapping any failure to
    /// [`Password::Undecryptable`].
    #[must_use]
    pub fn open_password(&self, ciphertext: &str) -> Password {
        match self.decrypt(ciphertext) {
            Ok(plain) => Password::Plaintext(plain),
            Err(_) => Password::Undecryptable,
        }
    }
}

/// Encrypt plaintext using AES-256-GCM with a fresh random nonce.
///
/// Returns `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt bytes produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::CiphertextTooShort`] if the input is shorter than
/// 28 bytes, or [`CryptoError::Decryption`] if authentication fails.
pub fn decrypt(key: &EncryptionKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if combined.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            expected: MIN_CIPHERTEXT_LEN,
            actual: combined.len(),
        });
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })
}
