//! Sync registry persistence
//!
//! Maps a note to the directory and filename it was last exported to, so
//! re-export can reuse the destination without asking again.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

use crate::models::{NoteId, SyncRecord};
use crate::store::persistence::atomic_write;

/// Sync state of one note
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Unsynced,
    Synced(SyncRecord),
}

/// Persistent note → destination registry
///
/// Every mutation holds the lock across the read-modify-write and the save,
/// so concurrent exports of the same note never interleave.
#[derive(Debug, Default)]
pub struct SyncRegistry {
    records: Mutex<HashMap<NoteId, SyncRecord>>,
    /// Path to persist records (in-memory only when `None`)
    path: Option<PathBuf>,
}

impl SyncRegistry {
    /// Create an in-memory registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that persists to disk
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let records = if path.exists() {
            load(&path)?
        } else {
            HashMap::new()
        };
        debug!("Loaded {} sync record(s) from {:?}", records.len(), path);

        Ok(Self {
            records: Mutex::new(records),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NoteId, SyncRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, note: NoteId) -> Option<SyncRecord> {
        self.lock().get(&note).cloned()
    }

    pub fn status(&self, note: NoteId) -> SyncStatus {
        match self.get(note) {
            Some(record) => SyncStatus::Synced(record),
            None => SyncStatus::Unsynced,
        }
    }

    pub fn is_synced(&self, note: NoteId) -> bool {
        self.lock().contains_key(&note)
    }

    /// Create or replace the record of `note`
    pub fn record(&self, note: NoteId, directory: &Path, filename: &str) -> Result<SyncRecord> {
        let mut records = self.lock();
        let record = SyncRecord {
            note_id: note,
            directory: directory.to_path_buf(),
            filename: filename.to_string(),
            last_synced: Utc::now(),
        };
        let previous = records.insert(note, record.clone());

        if let Err(e) = self.save(&records) {
            match previous {
                Some(previous) => records.insert(note, previous),
                None => records.remove(&note),
            };
            return Err(e);
        }

        debug!("Recorded sync of note {} to {:?}", note, record.path());
        Ok(record)
    }

    /// Refresh the timestamp of an existing record
    pub fn touch(&self, note: NoteId) -> Result<Option<SyncRecord>> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&note) else {
            return Ok(None);
        };
        record.last_synced = Utc::now();
        let updated = record.clone();
        self.save(&records)?;
        Ok(Some(updated))
    }

    /// Forget a note; the only way back to unsynced
    pub fn remove(&self, note: NoteId) -> Result<Option<SyncRecord>> {
        let mut records = self.lock();
        let Some(removed) = records.remove(&note) else {
            return Ok(None);
        };

        if let Err(e) = self.save(&records) {
            records.insert(note, removed);
            return Err(e);
        }

        debug!("Removed sync record of note {}", note);
        Ok(Some(removed))
    }

    /// All records in note order
    pub fn records(&self) -> Vec<SyncRecord> {
        let mut records: Vec<SyncRecord> = self.lock().values().cloned().collect();
        records.sort_by_key(|r| r.note_id);
        records
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, records: &HashMap<NoteId, SyncRecord>) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let mut list: Vec<&SyncRecord> = records.values().collect();
        list.sort_by_key(|r| r.note_id);
        let json = serde_json::to_vec_pretty(&list)?;

        atomic_write(path, &json)
            .with_context(|| format!("Failed to save sync registry: {:?}", path))
    }
}

fn load(path: &Path) -> Result<HashMap<NoteId, SyncRecord>> {
    let json = fs::read_to_string(path).context("Failed to read sync registry")?;
    let list: Vec<SyncRecord> =
        serde_json::from_str(&json).context("Failed to parse sync registry")?;
    Ok(list.into_iter().map(|r| (r.note_id, r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_get() {
        let registry = SyncRegistry::new();
        assert_eq!(registry.status(NoteId(1)), SyncStatus::Unsynced);

        let record = registry
            .record(NoteId(1), Path::new("/out"), "Note.md")
            .unwrap();
        assert_eq!(record.path(), PathBuf::from("/out/Note.md"));
        assert!(registry.is_synced(NoteId(1)));
        assert!(matches!(registry.status(NoteId(1)), SyncStatus::Synced(_)));
    }

    #[test]
    fn test_rerecord_only_touches_one_note() {
        let registry = SyncRegistry::new();
        registry.record(NoteId(1), Path::new("/a"), "one.md").unwrap();
        let other = registry.record(NoteId(2), Path::new("/b"), "two.md").unwrap();

        registry.record(NoteId(1), Path::new("/c"), "one.md").unwrap();

        assert_eq!(registry.get(NoteId(1)).unwrap().directory, PathBuf::from("/c"));
        assert_eq!(registry.get(NoteId(2)).unwrap(), other);
    }

    #[test]
    fn test_touch_and_remove() {
        let registry = SyncRegistry::new();
        assert!(registry.touch(NoteId(5)).unwrap().is_none());

        let first = registry.record(NoteId(5), Path::new("/d"), "n.md").unwrap();
        let touched = registry.touch(NoteId(5)).unwrap().unwrap();
        assert_eq!(touched.filename, first.filename);
        assert!(touched.last_synced >= first.last_synced);

        assert!(registry.remove(NoteId(5)).unwrap().is_some());
        assert!(registry.remove(NoteId(5)).unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sync_registry.json");

        {
            let registry = SyncRegistry::with_path(path.clone()).unwrap();
            registry.record(NoteId(3), Path::new("/x"), "three.md").unwrap();
            registry.record(NoteId(1), Path::new("/x"), "one.md").unwrap();
        }

        let registry = SyncRegistry::with_path(path).unwrap();
        let ids: Vec<_> = registry.records().iter().map(|r| r.note_id).collect();
        assert_eq!(ids, vec![NoteId(1), NoteId(3)]);
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes every save fail
        let path = temp_dir.path().join("registry");
        fs::create_dir_all(path.join("blocker")).unwrap();
        let registry = SyncRegistry {
            records: Mutex::new(HashMap::new()),
            path: Some(path),
        };

        assert!(registry.record(NoteId(1), Path::new("/x"), "a.md").is_err());
        assert!(!registry.is_synced(NoteId(1)));
    }

    #[test]
    fn test_concurrent_records_are_consistent() {
        let temp_dir = TempDir::new().unwrap();
        let registry =
            Arc::new(SyncRegistry::with_path(temp_dir.path().join("reg.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .record(NoteId(i % 2), Path::new("/out"), &format!("{}.md", i))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 2);
        let reloaded = SyncRegistry::with_path(temp_dir.path().join("reg.json")).unwrap();
        assert_eq!(reloaded.records(), registry.records());
    }
}
