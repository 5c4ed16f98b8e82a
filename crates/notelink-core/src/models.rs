//! Data models for notelink
//!
//! Defines the note identities, line records and the derived structures
//! (outline nodes, export units, sync records) shared by every module.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One block of a note's marked-up content.
pub type Line = String;

/// Item identity of a note inside the line store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(NoteId)
    }
}

/// Link-addressable identity of a note
///
/// Rendered in line text as `<scheme>://note/<library>/<key>/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteKey {
    /// Library the note lives in (`u` for the user library, or a numeric id)
    pub library: String,
    /// Item key, unique within the library
    pub key: String,
}

impl NoteKey {
    pub fn new(library: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            key: key.into(),
        }
    }

    /// Render the forward-link URI for this note
    pub fn to_uri(&self, scheme: &str) -> String {
        format!("{}://note/{}/{}/", scheme, self.library, self.key)
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.library, self.key)
    }
}

/// An embedded resource (usually an image) owned by a note
///
/// Lines reference it as `![alt](attachment:<key>)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identity, used for deduplication across notes
    pub key: String,
    /// File name used when the resource is written next to an export
    pub filename: String,
    /// Raw content
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Resource {
    pub fn new(key: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            filename: filename.into(),
            data,
        }
    }
}

/// A heading-derived section of a note
///
/// `line_index` is the heading line; `end_index` is the last line that still
/// belongs to the section. Never persisted, always rebuilt from lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub level: u8,
    pub name: String,
    pub line_index: usize,
    pub end_index: usize,
    pub children: Vec<OutlineNode>,
}

/// Where a link is inserted relative to a chosen section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    /// Right below the heading line
    Start,
    /// After the last line of the section
    #[default]
    End,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Start => "start",
            InsertPosition::End => "end",
        }
    }
}

impl FromStr for InsertPosition {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to `End`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "start" => InsertPosition::Start,
            _ => InsertPosition::End,
        })
    }
}

/// How forward links are treated during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Inline linked notes into a single document
    Embed,
    /// Keep links and export every linked note as its own document
    Link,
}

/// One resolved (note, filename, content) triple ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportUnit {
    pub note: NoteId,
    pub filename: String,
    pub content: String,
    /// Set when the note only exists to hold embedded content and is
    /// erased once the unit has been written
    pub is_temporary: bool,
}

/// Persisted note → destination mapping used for re-export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub note_id: NoteId,
    pub directory: PathBuf,
    pub filename: String,
    pub last_synced: DateTime<Utc>,
}

impl SyncRecord {
    /// Full path of the synced file
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
