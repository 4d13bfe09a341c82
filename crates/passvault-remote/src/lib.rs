//! Remote collection abstraction for `passvault`.
//!
//! This crate defines the [`RemoteCollection`] trait: the CRUD surface of
//! the REST collection that persists vault records. It knows nothing about
//! encryption: the `password` field of every [`SealedRecord`] and
//! [`RecordBody`] is already ciphertext by the time it reaches this layer.
//!
//! Two implementations are provided:
//!
//! - [`HttpCollection`]: production client for `GET/POST /vault` and
//!   `PUT/DELETE /vault/{id}`, backed by `reqwest`
//! - [`MemoryCollection`]: in-process, for testing only

mod error;
mod http;
mod memory;
mod types;

pub use error::RemoteError;
pub use http::{HttpCollection, HttpCollectionConfig};
pub use memory::MemoryCollection;
pub use types::{RecordBody, SealedRecord};

/// The remote record collection.
///
/// Every call carries the caller's bearer token; the collection holds no
/// session state of its own. Implementations must be safe to share across
/// async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait RemoteCollection: Send + Sync + 'static {
    /// List every record visible to the token.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the collection rejects the call or is
    /// unreachable.
    async fn list(&self, token: &str) -> Result<Vec<SealedRecord>, RemoteError>;

    /// Create a new record. The collection assigns the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the collection rejects the call or is
    /// unreachable.
    async fn create(&self, token: &str, body: &RecordBody) -> Result<(), RemoteError>;

    /// Replace the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] if no such record exists, or another
    /// [`RemoteError`] if the call fails.
    async fn update(&self, token: &str, id: &str, body: &RecordBody) -> Result<(), RemoteError>;

    /// Delete the record stored under `id`.
    ///
    /// Unlike a storage backend delete, this is not idempotent: removing an
    /// unknown id surfaces the collection's error.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] if no such record exists, or another
    /// [`RemoteError`] if the call fails.
    async fn delete(&self, token: &str, id: &str) -> Result<(), RemoteError>;
}
