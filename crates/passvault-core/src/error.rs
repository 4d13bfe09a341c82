//! Error types for `passvault-core`.
//!
//! Each error variant carries enough context to render a human-readable
//! status line. Crypto errors never include key material or plaintext.

use passvault_remote::RemoteError;

/// Errors from the record cipher.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// HKDF key derivation failed.
    #[error("key derivation failed for context '{context}': {reason}")]
    KeyDerivation { context: String, reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },

    /// The stored value is not base64 and so cannot be ciphertext.
    #[error("ciphertext is not valid base64: {reason}")]
    Encoding { reason: String },

    /// Authentication succeeded but the plaintext is not UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    NotUtf8,

    /// The configured encryption secret is empty.
    #[error("encryption key must not be empty")]
    EmptyKey,
}

/// Errors from the password generator.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Requested length is outside the supported range.
    #[error("password length must be between {min} and {max}, got {actual}")]
    LengthOutOfRange { min: usize, max: usize, actual: usize },
}

/// Errors from the system clipboard.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The clipboard could not be opened (no display server, permission denied).
    #[error("clipboard unavailable: {reason}")]
    Unavailable { reason: String },

    /// Writing to the clipboard failed.
    #[error("clipboard write failed: {reason}")]
    Write { reason: String },
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("missing required setting {name}")]
    Missing { name: &'static str },

    /// A setting is present but cannot be parsed.
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Errors from session storage.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the session file failed.
    #[error("session file '{path}': {reason}")]
    Io { path: String, reason: String },

    /// The session file exists but is not valid JSON.
    #[error("session file '{path}' is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

/// Errors surfaced by vault operations.
///
/// None of these are fatal: the controller turns each into a status line
/// and leaves the operation retryable.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The remote collection rejected the call or was unreachable.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// A record password could not be sealed.
    #[error("{0}")]
    Crypto(#[from] CryptoError),

    /// The session could not be read.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// No record with this id is in the current snapshot.
    #[error("no record with id '{id}'")]
    UnknownRecord { id: String },

    /// The record under edit has an unreadable password and the form has no
    /// replacement; saving would overwrite the stored ciphertext with "".
    #[error("password for '{title}' could not be decrypted; enter a new one before saving")]
    PasswordRequired { title: String },

    /// The record's password could not be decrypted, so there is nothing to
    /// reveal or copy.
    #[error("password for '{title}' could not be decrypted")]
    Undecryptable { title: String },
}
