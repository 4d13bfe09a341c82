//! Record store: the only path between plaintext records and the remote
//! collection.
//!
//! Every write seals the password through the [`CipherCodec`] before it
//! reaches the collection, and every fetch opens each password
//! individually. The in-memory list is never patched; it is replaced
//! wholesale by the next completed fetch.
//!
//! # Ordering
//!
//! Fetches are numbered when issued. A fetch that completes after a newer
//! one has already been applied is discarded, so a slow response cannot
//! roll the list back.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use passvault_remote::{RecordBody, RemoteCollection, SealedRecord};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::crypto::CipherCodec;
use crate::error::{CryptoError, VaultError};
use crate::record::{Draft, Password, VaultRecord};

#[derive(Debug, Default)]
struct Snapshot {
    seq: u64,
    records: Vec<VaultRecord>,
}

/// Owns the authoritative list of decrypted records.
pub struct VaultStore {
    remote: Arc<dyn RemoteCollection>,
    codec: CipherCodec,
    snapshot: RwLock<Snapshot>,
    issued: AtomicU64,
}

impl VaultStore {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteCollection>, codec: CipherCodec) -> Self {
        Self {
            remote,
            codec,
            snapshot: RwLock::new(Snapshot::default()),
            issued: AtomicU64::new(0),
        }
    }

    /// Fetch and decrypt every record, replacing the in-memory list.
    ///
    /// An empty token means there is no session: the result is empty and
    /// the collection is not contacted. A record whose password fails to
    /// decrypt is kept with [`Password::Undecryptable`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Remote`] if the collection call fails; the
    /// in-memory list is left as it was.
    pub async fn fetch_all(&self, token: &str) -> Result<Vec<VaultRecord>, VaultError> {
        if token.is_empty() {
            debug!("no session token; skipping fetch");
            return Ok(Vec::new());
        }

        let seq = self.issued.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let sealed = self.remote.list(token).await?;
        let records: Vec<VaultRecord> = sealed.into_iter().map(|s| self.open(s)).collect();

        self.apply(seq, &records).await;
        Ok(records)
    }

    /// Seal `draft` and create it remotely. The new record appears in the
    /// list after the next [`fetch_all`](Self::fetch_all).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] if sealing fails or
    /// [`VaultError::Remote`] if the collection rejects the call.
    pub async fn create(&self, token: &str, draft: &Draft) -> Result<(), VaultError> {
        let body = self.seal(draft)?;
        self.remote.create(token, &body).await?;
        info!(title = %draft.title, "record created");
        Ok(())
    }

    /// Seal `draft` and store it under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] if sealing fails or
    /// [`VaultError::Remote`] if the collection rejects the call.
    pub async fn update(&self, token: &str, id: &str, draft: &Draft) -> Result<(), VaultError> {
        let body = self.seal(draft)?;
        self.remote.update(token, id, &body).await?;
        info!(id, title = %draft.title, "record updated");
        Ok(())
    }

    /// Delete the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Remote`] if the collection rejects the call,
    /// including when `id` does not exist.
    pub async fn delete(&self, token: &str, id: &str) -> Result<(), VaultError> {
        self.remote.delete(token, id).await?;
        info!(id, "record deleted");
        Ok(())
    }

    /// The current list, as of the latest applied fetch.
    pub async fn records(&self) -> Vec<VaultRecord> {
        self.snapshot.read().await.records.clone()
    }

    /// Look up a record in the current list.
    pub async fn find(&self, id: &str) -> Option<VaultRecord> {
        self.snapshot
            .read()
            .await
            .records
            .iter()
            .find(|r| r.id.as_deref() == Some(id))
            .cloned()
    }

    /// Replace the list with the result of fetch `seq`, unless a newer
    /// fetch has already been applied. Returns whether it was applied.
    async fn apply(&self, seq: u64, records: &[VaultRecord]) -> bool {
        let mut snapshot = self.snapshot.write().await;
        if seq <= snapshot.seq {
            debug!(seq, applied = snapshot.seq, "discarding stale fetch result");
            return false;
        }
        snapshot.seq = seq;
        snapshot.records = records.to_vec();
        debug!(seq, count = records.len(), "record list replaced");
        true
    }

    fn seal(&self, draft: &Draft) -> Result<RecordBody, CryptoError> {
        Ok(RecordBody {
            title: draft.title.clone(),
            username: draft.username.clone(),
            password: self.codec.encrypt(&draft.password)?,
        })
    }

    fn open(&self, sealed: SealedRecord) -> VaultRecord {
        let password = self.codec.open_password(&sealed.password);
        if password == Password::Undecryptable {
            warn!(id = ?sealed.id, "record password could not be decrypted");
        }
        VaultRecord {
            id: sealed.id,
            title: sealed.title,
            username: sealed.username,
            password,
        }
    }
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use passvault_remote::{MemoryCollection, RemoteError};

    use super::*;

    fn codec() -> CipherCodec {
        CipherCodec::from_secret("test-secret").unwrap()
    }

    fn draft(title: &str, username: &str, password: &str) -> Draft {
        Draft {
            title: title.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }

    fn make_store() -> (VaultStore, MemoryCollection) {
        let remote = MemoryCollection::new();
        let store = VaultStore::new(Arc::new(remote.clone()), codec());
        (store, remote)
    }

    #[tokio::test]
    async fn fetch_without_token_makes_no_call() {
        let (store, remote) = make_store();
        let records = store.fetch_all("").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn create_never_sends_plaintext() {
        let (store, remote) = make_store();
        store
            .create("tok", &draft("GitHub", "bob", "hunter2"))
            .await
            .unwrap();

        let stored = remote.stored().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].username, "bob");
        assert_ne!(stored[0].password, "hunter2");
        assert!(!stored[0].password.contains("hunter2"));
        assert_eq!(codec().decrypt(&stored[0].password).unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn fetch_decrypts_and_replaces_list() {
        let (store, _remote) = make_store();
        store.create("tok", &draft("GitHub", "bob", "pw1")).await.unwrap();
        store.create("tok", &draft("Email", "alice", "pw2")).await.unwrap();

        let records = store.fetch_all("tok").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].password, Password::Plaintext("pw1".to_owned()));
        assert_eq!(store.records().await, records);
        assert_eq!(store.find("2").await.unwrap().title, "Email");
        assert!(store.find("99").await.is_none());
    }

    #[tokio::test]
    async fn one_bad_record_does_not_spoil_the_fetch() {
        let (store, remote) = make_store();
        store.create("tok", &draft("good-1", "a", "one")).await.unwrap();
        remote
            .seed(RecordBody {
                title: "legacy".to_owned(),
                username: "b".to_owned(),
                password: "U2FsdGVkX19notours".to_owned(),
            })
            .await;
        let foreign = CipherCodec::from_secret("other-key")
            .unwrap()
            .encrypt("theirs")
            .unwrap();
        remote
            .seed(RecordBody {
                title: "foreign".to_owned(),
                username: "c".to_owned(),
                password: foreign,
            })
            .await;
        store.create("tok", &draft("good-2", "d", "two")).await.unwrap();

        let records = store.fetch_all("tok").await.unwrap();
        let by_title = |t: &str| records.iter().find(|r| r.title == t).unwrap().password.clone();
        assert_eq!(records.len(), 4);
        assert_eq!(by_title("good-1"), Password::Plaintext("one".to_owned()));
        assert_eq!(by_title("legacy"), Password::Undecryptable);
        assert_eq!(by_title("foreign"), Password::Undecryptable);
        assert_eq!(by_title("good-2"), Password::Plaintext("two".to_owned()));
    }

    #[tokio::test]
    async fn update_reseals_under_same_id() {
        let (store, remote) = make_store();
        store.create("tok", &draft("t", "u", "old")).await.unwrap();
        store.update("tok", "1", &draft("t2", "u", "new")).await.unwrap();

        let records = store.fetch_all("tok").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("1"));
        assert_eq!(records[0].title, "t2");
        assert_eq!(records[0].password.plaintext(), Some("new"));
        assert_ne!(remote.stored().await[0].password, "new");
    }

    #[tokio::test]
    async fn delete_unknown_id_surfaces_error() {
        let (store, _remote) = make_store();
        let err = store.delete("tok", "404").await.unwrap_err();
        assert!(matches!(
            err,
            VaultError::Remote(RemoteError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_list() {
        let (store, remote) = make_store();
        store.create("tok", &draft("t", "u", "p")).await.unwrap();
        store.fetch_all("tok").await.unwrap();

        remote.fail_next(503, "maintenance").await;
        assert!(store.fetch_all("tok").await.is_err());
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn stale_fetch_is_discarded() {
        let (store, _remote) = make_store();
        let record = |title: &str| VaultRecord {
            id: None,
            title: title.to_owned(),
            username: String::new(),
            password: Password::Plaintext(String::new()),
        };

        assert!(store.apply(2, &[record("newer")]).await);
        assert!(!store.apply(1, &[record("older")]).await);
        assert_eq!(store.records().await[0].title, "newer");

        assert!(store.apply(3, &[]).await);
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn later_fetches_are_applied() {
        let (store, _remote) = make_store();
        store.fetch_all("tok").await.unwrap();
        store.create("tok", &draft("t", "u", "p")).await.unwrap();
        store.fetch_all("tok").await.unwrap();
        assert_eq!(store.records().await.len(), 1);
    }
}
