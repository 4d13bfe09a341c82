//! Session providers.
//!
//! The login flow lives outside this crate; it leaves a bearer token and
//! user id in a small key-value file. Vault operations ask a
//! [`SessionProvider`] for the current session at call time, so a session
//! that appears or disappears between calls is picked up without restarts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Credentials for the remote collection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(token: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            user_id,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Source of the current session.
pub trait SessionProvider: Send + Sync {
    /// The current session, or `None` when signed out.
    ///
    /// A session with an empty token counts as signed out.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing store exists but cannot be
    /// read.
    fn session(&self) -> Result<Option<Session>, SessionError>;
}

/// A fixed session, e.g. from a `--token` flag.
#[derive(Debug, Clone)]
pub struct StaticSession(Option<Session>);

impl StaticSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self(Some(session))
    }

    /// A provider that is always signed out.
    #[must_use]
    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl SessionProvider for StaticSession {
    fn session(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.0.clone().filter(|s| !s.token.is_empty()))
    }
}

/// Session persisted as JSON: `{"token": "...", "userId": "..."}`.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `session`, creating parent directories as needed. On unix the
    /// file is readable by the owner only.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the file cannot be written.
    pub fn store(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_error(&e))?;
        }
        let json = serde_json::to_string_pretty(session).map_err(|e| SessionError::Malformed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(&e))?;
        restrict_permissions(&self.path).map_err(|e| self.io_error(&e))?;
        Ok(())
    }

    /// Remove the session file. Removing an absent file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(&e)),
        }
    }

    fn io_error(&self, e: &std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl SessionProvider for FileSession {
    fn session(&self) -> Result<Option<Session>, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(&e)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let session: Session =
            serde_json::from_str(&content).map_err(|e| SessionError::Malformed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(session).filter(|s| !s.token.is_empty()))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn static_session_filters_empty_token() {
        assert!(StaticSession::new(Session::new("", None)).session().unwrap().is_none());
        assert!(StaticSession::signed_out().session().unwrap().is_none());
        let s = StaticSession::new(Session::new("tok", Some("u1".to_owned())))
            .session()
            .unwrap()
            .unwrap();
        assert_eq!(s.token, "tok");
    }

    #[test]
    fn missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSession::new(dir.path().join("nope.json"));
        assert!(provider.session().unwrap().is_none());
    }

    #[test]
    fn store_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSession::new(dir.path().join("nested/session.json"));
        provider
            .store(&Session::new("tok-1", Some("user-9".to_owned())))
            .unwrap();

        let raw = std::fs::read_to_string(provider.path()).unwrap();
        assert!(raw.contains("\"userId\""));

        let session = provider.session().unwrap().unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(session.user_id.as_deref(), Some("user-9"));
    }

    #[cfg(unix)]
    #[test]
    fn stored_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSession::new(dir.path().join("session.json"));
        provider.store(&Session::new("tok", None)).unwrap();
        let mode = std::fs::metadata(provider.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn clear_removes_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSession::new(dir.path().join("session.json"));
        provider.store(&Session::new("tok", None)).unwrap();
        provider.clear().unwrap();
        assert!(provider.session().unwrap().is_none());
        provider.clear().unwrap();
    }

    #[test]
    fn empty_token_in_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"token":"","userId":"u"}"#).unwrap();
        assert!(FileSession::new(path).session().unwrap().is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileSession::new(path).session(),
            Err(SessionError::Malformed { .. })
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", Session::new("very-secret-token", None));
        assert!(!debug.contains("very-secret-token"));
    }
}
