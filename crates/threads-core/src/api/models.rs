//! Data models for the Threads API.
//!
//! Only the fields the client acts on are typed; everything else the server
//! returns is kept in `extra` so callers (and `--json` output) see it intact.

use serde::{Deserialize, Serialize};

use crate::api::envelope::MessageEnvelope;

/// Fields the client does not interpret.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// A conversation container holding messages and references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Thread ID.
    pub id: i64,
    /// Display name, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remaining server fields.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Kind of reference attached to a thread.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferenceType {
    /// A link to an external URL.
    Url,
    /// An uploaded file with version history.
    File,
}

impl ReferenceType {
    /// Wire value used in form fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::File => "FILE",
        }
    }
}

/// An attachment on a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// Reference ID. The detail route does not always echo it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Reference name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning thread ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<i64>,
    /// URL or FILE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<ReferenceType>,
    /// File versions, in the order the server lists them. Empty for URL references.
    #[serde(default)]
    pub file_versions: Vec<FileVersion>,
    /// Remaining server fields.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Reference {
    /// First listed file version, which is the one downloads use.
    #[must_use]
    pub fn first_version(&self) -> Option<&FileVersion> {
        self.file_versions.first()
    }
}

/// One uploaded revision of a file reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    /// Download URL for this version's content.
    pub file: String,
    /// Remaining server fields.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A message posted to a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning thread ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<i64>,
    /// Body as stored by the server, normally a serialized rich-text envelope.
    #[serde(default)]
    pub text: String,
    /// Remaining server fields.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Message {
    /// Plain text of the message.
    ///
    /// Envelope bodies are decoded and their block texts joined with
    /// newlines; anything else is returned as-is.
    #[must_use]
    pub fn plain_text(&self) -> String {
        MessageEnvelope::parse(&self.text)
            .map_or_else(|_| self.text.clone(), |envelope| envelope.plain_text())
    }
}
