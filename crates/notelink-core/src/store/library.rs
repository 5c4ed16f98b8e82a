//! JSON-backed note library
//!
//! Holds every note in memory behind an async `RwLock` and, when opened
//! with a path, rewrites the library file after each mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::persistence::{self, LibraryFile, StoredNote};
use super::LineStore;
use crate::models::{Line, NoteId, NoteKey, Resource};
use crate::outline::title_from_lines;

/// Library id used for freshly created libraries
const DEFAULT_LIBRARY: &str = "1";

/// Short listing entry for a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub key: NoteKey,
    pub title: String,
    pub line_count: usize,
}

struct LibraryState {
    library: String,
    next_id: u64,
    notes: BTreeMap<NoteId, StoredNote>,
}

impl LibraryState {
    fn empty() -> Self {
        Self {
            library: DEFAULT_LIBRARY.to_string(),
            next_id: 1,
            notes: BTreeMap::new(),
        }
    }

    fn from_file(file: LibraryFile) -> Self {
        let next_id = file
            .notes
            .iter()
            .map(|n| n.id.0 + 1)
            .max()
            .unwrap_or(1)
            .max(file.next_id);
        Self {
            library: file.library,
            next_id,
            notes: file.notes.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    fn to_file(&self) -> LibraryFile {
        LibraryFile {
            library: self.library.clone(),
            next_id: self.next_id,
            notes: self.notes.values().cloned().collect(),
        }
    }

    fn note_mut(&mut self, id: NoteId) -> StoreResult<&mut StoredNote> {
        self.notes.get_mut(&id).ok_or(StoreError::NoteNotFound(id))
    }

    fn unique_key(&self) -> String {
        loop {
            let candidate = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
            if !self.notes.values().any(|n| n.key.key == candidate) {
                return candidate;
            }
        }
    }

    /// Undo [`LibraryState::insert_note`]
    fn remove_inserted(&mut self, id: NoteId) {
        self.notes.remove(&id);
        self.next_id = id.0;
    }

    fn insert_note(&mut self, lines: Vec<Line>) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        let key = NoteKey::new(self.library.clone(), self.unique_key());
        self.notes.insert(
            id,
            StoredNote {
                id,
                key,
                lines,
                resources: Vec::new(),
            },
        );
        id
    }
}

/// Note library implementing [`LineStore`]
pub struct Library {
    state: RwLock<LibraryState>,
    /// Path to persist the library (in-memory only when `None`)
    path: Option<PathBuf>,
}

impl Library {
    /// Create an empty in-memory library
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LibraryState::empty()),
            path: None,
        }
    }

    /// Open a library persisted at `path`, creating it on first write
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match persistence::load(&path)? {
            Some(file) => LibraryState::from_file(file),
            None => LibraryState::empty(),
        };
        debug!("Opened library at {:?} ({} notes)", path, state.notes.len());
        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create a note with initial content
    pub async fn add_note(&self, lines: Vec<Line>) -> StoreResult<NoteId> {
        let mut state = self.state.write().await;
        let id = state.insert_note(lines);
        if let Err(e) = self.persist(&state) {
            state.remove_inserted(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Create a note under a caller-chosen key
    ///
    /// Used when importing notes whose links must keep resolving. A key
    /// already in use is ignored and a fresh one is generated.
    pub async fn add_note_with_key(
        &self,
        key: impl Into<String>,
        lines: Vec<Line>,
    ) -> StoreResult<NoteId> {
        let key = key.into();
        let mut state = self.state.write().await;
        let taken = state.notes.values().any(|n| n.key.key == key);
        let id = state.insert_note(lines);
        if taken {
            warn!("Key {} already in use, note {} gets a generated key", key, id);
        } else {
            let library = state.library.clone();
            state.note_mut(id)?.key = NoteKey::new(library, key);
        }
        if let Err(e) = self.persist(&state) {
            state.remove_inserted(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Attach a resource to a note, replacing one with the same key
    pub async fn add_resource(&self, note: NoteId, resource: Resource) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let stored = state.note_mut(note)?;
        let previous = stored.resources.clone();
        stored.resources.retain(|r| r.key != resource.key);
        stored.resources.push(resource);

        if let Err(e) = self.persist(&state) {
            state.note_mut(note)?.resources = previous;
            return Err(e);
        }
        Ok(())
    }

    /// List every note in id order
    pub async fn list(&self) -> Vec<NoteSummary> {
        let state = self.state.read().await;
        state
            .notes
            .values()
            .map(|n| NoteSummary {
                id: n.id,
                key: n.key.clone(),
                title: title_from_lines(&n.lines),
                line_count: n.lines.len(),
            })
            .collect()
    }

    /// Number of notes in the library
    pub async fn len(&self) -> usize {
        self.state.read().await.notes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn persist(&self, state: &LibraryState) -> StoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        persistence::save(path, &state.to_file())
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineStore for Library {
    async fn get_lines(&self, note: NoteId) -> StoreResult<Vec<Line>> {
        let state = self.state.read().await;
        state
            .notes
            .get(&note)
            .map(|n| n.lines.clone())
            .ok_or(StoreError::NoteNotFound(note))
    }

    async fn set_lines(&self, note: NoteId, lines: Vec<Line>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut state.note_mut(note)?.lines, lines);
        if let Err(e) = self.persist(&state) {
            state.note_mut(note)?.lines = previous;
            return Err(e);
        }
        Ok(())
    }

    async fn create_note(&self) -> StoreResult<NoteId> {
        self.add_note(Vec::new()).await
    }

    async fn erase(&self, note: NoteId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let Some(removed) = state.notes.remove(&note) else {
            return Err(StoreError::NoteNotFound(note));
        };
        if let Err(e) = self.persist(&state) {
            state.notes.insert(note, removed);
            return Err(e);
        }
        debug!("Erased note {}", note);
        Ok(())
    }

    async fn copy_embedded_resources(
        &self,
        sources: &[NoteId],
        target: NoteId,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;

        // Validate everything before touching the target
        let mut incoming: Vec<Resource> = Vec::new();
        for source in sources {
            let note = state
                .notes
                .get(source)
                .ok_or_else(|| StoreError::ResourceCopy {
                    target,
                    details: format!("source note {} not found", source),
                })?;
            incoming.extend(note.resources.iter().cloned());
        }

        let stored = state
            .notes
            .get_mut(&target)
            .ok_or_else(|| StoreError::ResourceCopy {
                target,
                details: "target note not found".to_string(),
            })?;

        let previous = stored.resources.clone();
        for resource in incoming {
            if !stored.resources.iter().any(|r| r.key == resource.key) {
                stored.resources.push(resource);
            }
        }

        if let Err(e) = self.persist(&state) {
            if let Some(stored) = state.notes.get_mut(&target) {
                stored.resources = previous;
            }
            return Err(StoreError::ResourceCopy {
                target,
                details: e.to_string(),
            });
        }

        Ok(())
    }

    async fn resolve_key(&self, key: &NoteKey) -> StoreResult<Option<NoteId>> {
        let state = self.state.read().await;
        Ok(state
            .notes
            .values()
            .find(|n| n.key.key == key.key && n.key.library == key.library)
            .map(|n| n.id))
    }

    async fn note_key(&self, note: NoteId) -> StoreResult<NoteKey> {
        let state = self.state.read().await;
        state
            .notes
            .get(&note)
            .map(|n| n.key.clone())
            .ok_or(StoreError::NoteNotFound(note))
    }

    async fn resources(&self, note: NoteId) -> StoreResult<Vec<Resource>> {
        let state = self.state.read().await;
        state
            .notes
            .get(&note)
            .map(|n| n.resources.clone())
            .ok_or(StoreError::NoteNotFound(note))
    }
}
