//! Line store
//!
//! The line store owns notes: it reads and writes a note's content as an
//! ordered sequence of lines, creates and erases notes, and copies embedded
//! resources between them. The resolver and the exporters only talk to the
//! [`LineStore`] trait; [`Library`] is the JSON-backed implementation.

mod error;
mod library;
pub(crate) mod persistence;

pub(crate) use error::is_disk_full_error;
pub use error::{StoreError, StoreResult};
pub use library::{Library, NoteSummary};

use async_trait::async_trait;

use crate::models::{Line, NoteId, NoteKey, Resource};
use crate::outline::title_from_lines;

/// Storage capability consumed by the resolver and the export pipeline
#[async_trait]
pub trait LineStore: Send + Sync {
    /// Read a note's lines. Fails with `NoteNotFound` for unknown notes.
    async fn get_lines(&self, note: NoteId) -> StoreResult<Vec<Line>>;

    /// Replace a note's lines
    async fn set_lines(&self, note: NoteId, lines: Vec<Line>) -> StoreResult<()>;

    /// Create an empty note
    async fn create_note(&self) -> StoreResult<NoteId>;

    /// Erase a note and its resources
    async fn erase(&self, note: NoteId) -> StoreResult<()>;

    /// Copy the embedded resources of every source into `target`
    ///
    /// Transactional: either every source is copied or the target is left
    /// untouched and an error is returned.
    async fn copy_embedded_resources(&self, sources: &[NoteId], target: NoteId)
        -> StoreResult<()>;

    /// Map a link key to a note. `Ok(None)` when no such note exists.
    async fn resolve_key(&self, key: &NoteKey) -> StoreResult<Option<NoteId>>;

    /// Link key of a note
    async fn note_key(&self, note: NoteId) -> StoreResult<NoteKey>;

    /// Embedded resources owned by a note
    async fn resources(&self, note: NoteId) -> StoreResult<Vec<Resource>>;

    /// Display title: first heading, else first non-empty line
    async fn note_title(&self, note: NoteId) -> StoreResult<String> {
        let lines = self.get_lines(note).await?;
        Ok(title_from_lines(&lines))
    }
}
