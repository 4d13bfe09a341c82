//! In-memory remote collection for testing.
//!
//! Stores records in a `BTreeMap` behind a `RwLock` and assigns sequential
//! identifiers. Records the tokens it was called with and can be primed to
//! fail the next call, which lets callers exercise their error paths
//! without a server.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::error::RemoteError;
use crate::types::{RecordBody, SealedRecord};
use crate::RemoteCollection;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<String, RecordBody>,
    next_id: u64,
    fail_next: Option<(u16, String)>,
}

/// An in-memory remote collection.
///
/// Cloning shares the underlying data, so a test can keep one handle for
/// assertions while the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<RwLock<Inner>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing the call counter. Returns the
    /// assigned id.
    pub async fn seed(&self, body: RecordBody) -> String {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id.to_string();
        inner.records.insert(id.clone(), body);
        id
    }

    /// Snapshot of the stored records, as the collection sees them.
    pub async fn stored(&self) -> Vec<SealedRecord> {
        let inner = self.inner.read().await;
        inner
            .records
            .iter()
            .map(|(id, b)| SealedRecord {
                id: Some(id.clone()),
                title: b.title.clone(),
                username: b.username.clone(),
                password: b.password.clone(),
            })
            .collect()
    }

    /// Make the next call fail with the given HTTP status.
    pub async fn fail_next(&self, status: u16, message: &str) {
        self.inner.write().await.fail_next = Some((status, message.to_owned()));
    }

    /// Number of calls made through [`RemoteCollection`].
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.inner.write().await.fail_next.take() {
            Some((401 | 403, message)) => Err(RemoteError::Unauthorized(message)),
            Some((status, message)) => Err(RemoteError::Api { status, message }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RemoteCollection for MemoryCollection {
    async fn list(&self, _token: &str) -> Result<Vec<SealedRecord>, RemoteError> {
        self.begin().await?;
        Ok(self.stored().await)
    }

    async fn create(&self, _token: &str, body: &RecordBody) -> Result<(), RemoteError> {
        self.begin().await?;
        self.seed(body.clone()).await;
        Ok(())
    }

    async fn update(&self, _token: &str, id: &str, body: &RecordBody) -> Result<(), RemoteError> {
        self.begin().await?;
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(id) {
            Some(slot) => {
                *slot = body.clone();
                Ok(())
            }
            None => Err(RemoteError::NotFound { id: id.to_owned() }),
        }
    }

    async fn delete(&self, _token: &str, id: &str) -> Result<(), RemoteError> {
        self.begin().await?;
        let mut inner = self.inner.write().await;
        inner
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound { id: id.to_owned() })
    }
}
