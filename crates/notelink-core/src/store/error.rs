//! Line store error handling
//!
//! Typed errors for note storage with descriptive messages and recovery
//! suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::NoteId;

/// Errors that can occur during line store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The note does not exist (never created, or erased)
    #[error("Note {0} not found")]
    NoteNotFound(NoteId),

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Library file could not be parsed
    #[error("Invalid library format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// Library could not be serialized
    #[error("Failed to serialize library: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Copying embedded resources failed; the target was left unchanged
    #[error("Failed to copy embedded resources into note {target}: {details}")]
    ResourceCopy { target: NoteId, details: String },
}

impl StoreError {
    /// Create an error from a failed write with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StoreError::DiskFull {
                path,
                source: error,
            },
            _ => StoreError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Whether this is a missing-note condition rather than a storage failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NoteNotFound(_))
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::DiskFull { .. }
                | StoreError::PermissionDenied { .. }
                | StoreError::NoteNotFound(_)
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::DiskFull { .. } => Some("Free up disk space and try again."),
            StoreError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the notelink data directory.")
            }
            StoreError::InvalidFormat { .. } => {
                Some("The library file is damaged. Restore it from a backup or remove it to start fresh.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
pub(crate) fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for line store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StoreError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StoreError::from_io(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StoreError::DiskFull { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_other_io_is_write_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "broken pipe");
        let err = StoreError::from_io(io_err, PathBuf::from("/lib.json"));

        assert!(matches!(err, StoreError::WriteError { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NoteNotFound(NoteId(42));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Note 42 not found");
    }
}
