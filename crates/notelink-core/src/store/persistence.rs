//! Library file persistence
//!
//! The library is stored as a single JSON document. Writes are atomic
//! (write to temp file, then rename) so a crash never leaves a
//! half-written library behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use crate::models::{Line, NoteId, NoteKey, Resource};

/// On-disk representation of one note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredNote {
    pub id: NoteId,
    pub key: NoteKey,
    pub lines: Vec<Line>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// On-disk representation of the whole library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LibraryFile {
    pub library: String,
    pub next_id: u64,
    pub notes: Vec<StoredNote>,
}

/// Load a library file
///
/// Returns `None` if the file doesn't exist.
pub(crate) fn load(path: &Path) -> StoreResult<Option<LibraryFile>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path).map_err(|source| StoreError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let file = serde_json::from_str(&json).map_err(|e| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    Ok(Some(file))
}

/// Save a library file atomically
pub(crate) fn save(path: &Path, file: &LibraryFile) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(file)?;
    atomic_write(path, &json).map_err(|e| StoreError::from_io(e, path.to_path_buf()))
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> LibraryFile {
        LibraryFile {
            library: "1".to_string(),
            next_id: 3,
            notes: vec![StoredNote {
                id: NoteId(2),
                key: NoteKey::new("1", "ABCD1234"),
                lines: vec!["# Title".to_string(), "body".to_string()],
                resources: vec![Resource::new("IMG", "img.png", vec![1, 2, 3])],
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.json");

        assert!(load(&path).unwrap().is_none());

        save(&path, &sample()).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.next_id, 3);
        assert_eq!(loaded.notes.len(), 1);
        assert_eq!(loaded.notes[0].lines[1], "body");
        assert_eq!(loaded.notes[0].resources[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("library.json");
        fs::write(&path, "not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFormat { .. }));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("file.json");

        atomic_write(&nested_path, b"test data").unwrap();

        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "test data");
        assert!(!nested_path.with_extension("tmp").exists());
    }
}
