//! UI-facing orchestration.
//!
//! [`VaultController`] holds the edit form, the search query, the generator
//! policy, and a one-line status, and drives the store, the generator and
//! the clipboard timer in response to discrete user actions.
//!
//! Every operation is non-fatal: failures become the status line and leave
//! the form intact so the action can be retried. Without a session, remote
//! operations do nothing but say so, and return `Ok(false)`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::clipboard::{Clipboard, ClipboardEvent, ClipboardTimer};
use crate::error::VaultError;
use crate::generator::{self, GeneratorPolicy};
use crate::record::{Draft, Password, VaultRecord};
use crate::session::SessionProvider;
use crate::store::VaultStore;

pub const STATUS_NOT_SIGNED_IN: &str = "Not signed in";

/// Drives the vault on behalf of a user interface.
pub struct VaultController {
    store: VaultStore,
    session: Arc<dyn SessionProvider>,
    clipboard: ClipboardTimer,
    clipboard_events: mpsc::UnboundedReceiver<ClipboardEvent>,
    form: Draft,
    editing_id: Option<String>,
    /// The record under edit had a password that failed to decrypt.
    password_unreadable: bool,
    search_query: String,
    policy: GeneratorPolicy,
    status: Option<String>,
}

impl VaultController {
    #[must_use]
    pub fn new(
        store: VaultStore,
        session: Arc<dyn SessionProvider>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        let (clipboard, clipboard_events) = ClipboardTimer::new(clipboard);
        Self {
            store,
            session,
            clipboard,
            clipboard_events,
            form: Draft::default(),
            editing_id: None,
            password_unreadable: false,
            search_query: String::new(),
            policy: GeneratorPolicy::default(),
            status: None,
        }
    }

    #[must_use]
    pub fn form(&self) -> &Draft {
        &self.form
    }

    /// Mutable access to the draft, for field-by-field edits.
    pub fn form_mut(&mut self) -> &mut Draft {
        &mut self.form
    }

    /// Id of the record being edited, if any.
    #[must_use]
    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    pub fn policy_mut(&mut self) -> &mut GeneratorPolicy {
        &mut self.policy
    }

    /// The latest user-visible status message.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Reload the record list from the remote collection.
    ///
    /// Returns `Ok(false)` when signed out; nothing is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] if the session cannot be read or the fetch
    /// fails; the previous list is kept.
    pub async fn refresh(&mut self) -> Result<bool, VaultError> {
        let Some(token) = self.token()? else {
            return Ok(false);
        };
        match self.store.fetch_all(&token).await {
            Ok(records) => {
                debug!(count = records.len(), "vault refreshed");
                Ok(true)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Save the form: update the record under edit, or create a new one.
    ///
    /// On success the form and edit target are cleared and the list is
    /// refreshed. On failure both are kept for a retry. Returns `Ok(false)`
    /// when signed out; nothing is saved.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::PasswordRequired`] when the record under edit
    /// could not be decrypted and no new password was entered, or
    /// [`VaultError`] if the save or the follow-up refresh fails.
    pub async fn submit(&mut self) -> Result<bool, VaultError> {
        if self.editing_id.is_some() && self.password_unreadable && self.form.password.is_empty() {
            return Err(self.fail(VaultError::PasswordRequired {
                title: self.form.title.clone(),
            }));
        }
        let Some(token) = self.token()? else {
            return Ok(false);
        };

        let result = match &self.editing_id {
            Some(id) => self.store.update(&token, id, &self.form).await,
            None => self.store.create(&token, &self.form).await,
        };
        if let Err(e) = result {
            return Err(self.fail(e));
        }

        let status = if self.editing_id.is_some() {
            "Updated"
        } else {
            "Saved"
        };
        self.reset_form();
        self.status = Some(status.to_owned());
        self.refresh().await
    }

    /// Load `record` into the form and make it the edit target.
    ///
    /// A password that failed to decrypt is not carried into the form; the
    /// user has to enter a new one before [`submit`](Self::submit) accepts
    /// the edit.
    pub fn edit(&mut self, record: &VaultRecord) {
        self.form = Draft {
            title: record.title.clone(),
            username: record.username.clone(),
            password: record.password.plaintext().unwrap_or_default().to_owned(),
        };
        self.editing_id.clone_from(&record.id);
        self.password_unreadable = record.password == Password::Undecryptable;
        if self.password_unreadable {
            self.status = Some(format!(
                "Password for '{}' could not be decrypted; enter a new one",
                record.title
            ));
        }
    }

    /// Drop the draft and leave edit mode.
    pub fn reset_form(&mut self) {
        self.form = Draft::default();
        self.editing_id = None;
        self.password_unreadable = false;
    }

    /// Set the live search query.
    pub fn search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// The current list filtered by the search query.
    pub async fn visible(&self) -> Vec<VaultRecord> {
        self.store
            .records()
            .await
            .into_iter()
            .filter(|r| r.matches(&self.search_query))
            .collect()
    }

    /// Look up a record in the current list.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnknownRecord`] if the id is not in the list.
    pub async fn record(&self, id: &str) -> Result<VaultRecord, VaultError> {
        self.store
            .find(id)
            .await
            .ok_or_else(|| VaultError::UnknownRecord { id: id.to_owned() })
    }

    /// Delete a record and refresh. Returns `Ok(false)` when signed out.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] if the collection rejects the delete
    /// (including an unknown id) or the refresh fails.
    pub async fn remove(&mut self, id: &str) -> Result<bool, VaultError> {
        let Some(token) = self.token()? else {
            return Ok(false);
        };
        if let Err(e) = self.store.delete(&token, id).await {
            return Err(self.fail(e));
        }
        if self.editing_id.as_deref() == Some(id) {
            self.reset_form();
        }
        self.status = Some("Deleted".to_owned());
        self.refresh().await
    }

    /// Fill the form password from the current generator policy.
    pub fn generate(&mut self) -> &str {
        self.form.password = generator::generate(&self.policy);
        &self.form.password
    }

    /// Copy a record's password to the clipboard with auto-clear.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Undecryptable`] if the password could not be
    /// decrypted; nothing is copied.
    pub fn copy_password(&mut self, record: &VaultRecord) -> Result<ClipboardEvent, VaultError> {
        match &record.password {
            Password::Plaintext(p) => Ok(self.copy_text(p)),
            Password::Undecryptable => Err(self.fail(VaultError::Undecryptable {
                title: record.title.clone(),
            })),
        }
    }

    /// Copy arbitrary text to the clipboard with auto-clear.
    pub fn copy_text(&mut self, text: &str) -> ClipboardEvent {
        let event = self.clipboard.copy(text);
        self.absorb_clipboard_events();
        event
    }

    /// Whether copied text is still waiting to be cleared.
    #[must_use]
    pub fn clipboard_pending(&self) -> bool {
        self.clipboard.is_pending()
    }

    /// Clear the clipboard now instead of waiting for the timer.
    pub fn clear_clipboard_now(&mut self) -> Option<ClipboardEvent> {
        let event = self.clipboard.clear_now();
        self.absorb_clipboard_events();
        event
    }

    /// Wait for the next clipboard status change and show it.
    pub async fn next_clipboard_event(&mut self) -> Option<ClipboardEvent> {
        let event = self.clipboard_events.recv().await?;
        self.status = Some(event.to_string());
        Some(event)
    }

    fn absorb_clipboard_events(&mut self) {
        while let Ok(event) = self.clipboard_events.try_recv() {
            self.status = Some(event.to_string());
        }
    }

    /// Current token, or `None` (with status) when signed out.
    fn token(&mut self) -> Result<Option<String>, VaultError> {
        match self.session.session() {
            Ok(Some(session)) => Ok(Some(session.token)),
            Ok(None) => {
                debug!("no session; vault operation skipped");
                self.status = Some(STATUS_NOT_SIGNED_IN.to_owned());
                Ok(None)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn fail(&mut self, err: VaultError) -> VaultError {
        self.status = Some(err.to_string());
        err
    }
}

impl std::fmt::Debug for VaultController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultController")
            .field("form", &self.form)
            .field("editing_id", &self.editing_id)
            .field("search_query", &self.search_query)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
