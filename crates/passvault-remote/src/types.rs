//! Wire types for the remote collection.

use serde::{Deserialize, Serialize};

/// A record as the remote collection stores it.
///
/// `password` is always ciphertext. Document stores commonly name the
/// identifier `_id`, and some send `id` alongside it; `id` wins when both
/// are present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireRecord")]
pub struct SealedRecord {
    /// Identifier assigned by the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display label.
    #[serde(default)]
    pub title: String,
    /// Account name, stored as-is.
    #[serde(default)]
    pub username: String,
    /// Encrypted password.
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    document_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl From<WireRecord> for SealedRecord {
    fn from(wire: WireRecord) -> Self {
        Self {
            id: wire.id.or(wire.document_id),
            title: wire.title,
            username: wire.username,
            password: wire.password,
        }
    }
}

/// Request body for create and update calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBody {
    pub title: String,
    pub username: String,
    /// Encrypted password.
    pub password: String,
}

impl std::fmt::Debug for SealedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedRecord")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[SEALED]")
            .finish()
    }
}

impl std::fmt::Debug for RecordBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBody")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[SEALED]")
            .finish()
    }
}

#[derive(Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
    pub error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiErrorDetail {
    Text(String),
    Object { message: Option<String> },
}

impl ApiErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(match self.error {
            Some(ApiErrorDetail::Text(text)) => Some(text),
            Some(ApiErrorDetail::Object { message }) => message,
            None => None,
        })
    }
}
