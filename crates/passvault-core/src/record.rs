//! In-memory vault records.
//!
//! A [`VaultRecord`] always holds its password in opened form; the sealed
//! counterpart that crosses the network is
//! [`passvault_remote::SealedRecord`]. Keeping them as separate types means
//! ciphertext can never be rendered as a password, and plaintext can never
//! be sent to the collection without going through the codec.

use std::fmt;

/// Placeholder rendered in place of a password that failed to decrypt.
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[decryption failed]";

/// An opened password field.
#[derive(Clone, PartialEq, Eq)]
pub enum Password {
    /// The decrypted value.
    Plaintext(String),
    /// Decryption failed (wrong key, corrupted or foreign ciphertext).
    Undecryptable,
}

impl Password {
    /// The plaintext, if decryption succeeded.
    #[must_use]
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            Self::Plaintext(p) => Some(p),
            Self::Undecryptable => None,
        }
    }

    /// Text to show in a list: the plaintext or the placeholder.
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.plaintext().unwrap_or(UNDECRYPTABLE_PLACEHOLDER)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext(_) => f.write_str("Plaintext([REDACTED])"),
            Self::Undecryptable => f.write_str("Undecryptable"),
        }
    }
}

/// A decrypted record as held for display and editing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultRecord {
    /// Identifier assigned by the remote collection.
    pub id: Option<String>,
    pub title: String,
    pub username: String,
    pub password: Password,
}

impl VaultRecord {
    /// Case-insensitive substring match on title or username.
    ///
    /// The password never participates in search.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.title.to_lowercase().contains(&q) || self.username.to_lowercase().contains(&q)
    }
}

/// The editable form: a record that may not exist remotely yet.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, username: &str) -> VaultRecord {
        VaultRecord {
            id: None,
            title: title.to_owned(),
            username: username.to_owned(),
            password: Password::Plaintext("Bob-and-Email".to_owned()),
        }
    }

    #[test]
    fn matches_title_or_username_case_insensitively() {
        let github = record("GitHub", "bob");
        assert!(github.matches("bo"));
        assert!(github.matches("HUB"));
        assert!(github.matches(""));
        assert!(!github.matches("mail"));
    }

    #[test]
    fn password_never_matches() {
        assert!(!record("x", "y").matches("email"));
    }

    #[test]
    fn undecryptable_renders_placeholder() {
        assert_eq!(Password::Undecryptable.display_text(), UNDECRYPTABLE_PLACEHOLDER);
        assert_eq!(Password::Undecryptable.plaintext(), None);
        // A stored password that happens to equal the placeholder text is
        // still a plaintext value, not a failure.
        let lookalike = Password::Plaintext(UNDECRYPTABLE_PLACEHOLDER.to_owned());
        assert_ne!(lookalike, Password::Undecryptable);
    }

    #[test]
    fn debug_redacts_secrets() {
        let draft = Draft {
            title: "t".to_owned(),
            username: "u".to_owned(),
            password: "hunter2".to_owned(),
        };
        assert!(!format!("{draft:?}").contains("hunter2"));
        assert!(!format!("{:?}", record("a", "b")).contains("Bob-and-Email"));
    }
}
